//! Invoice PDF

use clinic_db::models::Bill;
use rust_decimal::Decimal;
use tracing::debug;

use super::{file_part, ExportError, PageWriter};

/// `Invoice_<billNumber>_<PatientName>.pdf`
pub fn invoice_filename(bill: &Bill) -> String {
    format!(
        "Invoice_{}_{}.pdf",
        file_part(&bill.bill_number),
        file_part(&bill.patient_name)
    )
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Renders `bill` as an A4 invoice.
///
/// `paid` is the sum of payments recorded against the bill; the balance due
/// shown is `total - paid`, never below zero.
pub fn render_invoice_pdf(bill: &Bill, paid: Decimal, clinic_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut page = PageWriter::new(&format!("Invoice {}", bill.bill_number))?;

    page.title(clinic_name);
    page.line(&format!("INVOICE {}", bill.bill_number));
    page.gap(2.0);

    page.field("Patient:", &bill.patient_name);
    page.field("Issue date:", &bill.issue_date.format("%d %b %Y").to_string());
    page.field("Due date:", &bill.due_date.format("%d %b %Y").to_string());
    page.field("Status:", bill.status.as_str());
    if let Some(method) = bill.payment_method {
        page.field("Payment method:", method.as_str());
    }

    page.heading("SERVICES");
    page.columns(
        &[(20.0, "Description"), (120.0, "Qty"), (140.0, "Unit price"), (172.0, "Amount")],
        true,
    );
    for item in &bill.items {
        let quantity = item.quantity.to_string();
        let unit_price = money(item.unit_price);
        let total = money(item.total);
        let description: String = item.description.chars().take(55).collect();
        page.columns(
            &[
                (20.0, description.as_str()),
                (120.0, quantity.as_str()),
                (140.0, unit_price.as_str()),
                (172.0, total.as_str()),
            ],
            false,
        );
    }

    page.gap(3.0);
    let rows = [
        ("Subtotal", money(bill.subtotal)),
        ("Tax", money(bill.tax)),
        ("Discount", format!("-{}", money(bill.discount))),
        ("Total", money(bill.total)),
        ("Amount paid", money(paid)),
        ("Balance due", money((bill.total - paid).max(Decimal::ZERO))),
    ];
    for (label, value) in &rows {
        page.columns(&[(140.0, *label), (172.0, value.as_str())], *label == "Total");
    }

    if !bill.notes.trim().is_empty() {
        page.heading("NOTES");
        page.paragraph(&bill.notes, 0.0);
    }

    page.gap(6.0);
    page.line("Thank you for choosing our clinic.");

    let bytes = page.finish()?;
    debug!(bill_number = %bill.bill_number, size = bytes.len(), "invoice rendered");
    Ok(bytes)
}
