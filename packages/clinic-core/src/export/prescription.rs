//! Prescriptions and their PDF

use chrono::NaiveDate;
use clinic_db::models::Patient;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{dd_mm_yyyy, file_part, ExportError, PageWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub medicine: String,
    pub dosage: String,
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
}

impl PrescriptionItem {
    /// Medicine, dosage and duration are all filled in
    pub fn is_complete(&self) -> bool {
        [&self.medicine, &self.dosage, &self.duration]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub patient_mobile: String,
    pub date: NaiveDate,
    pub diagnosis: String,
    pub items: Vec<PrescriptionItem>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub next_visit_date: Option<NaiveDate>,
    pub doctor_name: String,
    pub clinic_name: String,
}

impl Prescription {
    /// Empty prescription with the patient header filled from `patient`
    pub fn for_patient(patient: &Patient, date: NaiveDate, doctor_name: &str, clinic_name: &str) -> Self {
        Self {
            patient_id: patient.id,
            patient_name: patient.full_name(),
            patient_age: patient.age_on(date),
            patient_gender: patient
                .gender
                .clone()
                .unwrap_or_else(|| "Not specified".to_string()),
            patient_mobile: patient.phone.clone(),
            date,
            diagnosis: String::new(),
            items: Vec::new(),
            notes: String::new(),
            next_visit_date: None,
            doctor_name: doctor_name.to_string(),
            clinic_name: clinic_name.to_string(),
        }
    }

    pub fn complete_items(&self) -> impl Iterator<Item = &PrescriptionItem> {
        self.items.iter().filter(|item| item.is_complete())
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.diagnosis.trim().is_empty() {
            return Err(ExportError::MissingDiagnosis);
        }
        if self.complete_items().next().is_none() {
            return Err(ExportError::NoCompleteItems);
        }
        Ok(())
    }
}

/// `Prescription_<PatientName>_<dd-mm-yyyy>.pdf`
pub fn prescription_filename(prescription: &Prescription) -> String {
    format!(
        "Prescription_{}_{}.pdf",
        file_part(&prescription.patient_name),
        dd_mm_yyyy(prescription.date)
    )
}

/// Renders a validated prescription; incomplete items are left out
pub fn render_prescription_pdf(prescription: &Prescription) -> Result<Vec<u8>, ExportError> {
    prescription.validate()?;

    let mut page = PageWriter::new(&format!("Prescription {}", prescription.patient_name))?;
    page.title(&prescription.clinic_name);
    page.line(&format!("Dr. {}", prescription.doctor_name.trim_start_matches("Dr. ")));
    page.gap(2.0);

    page.field("Patient:", &prescription.patient_name);
    page.field("Age / Gender:", &format!("{} / {}", prescription.patient_age, prescription.patient_gender));
    page.field("Mobile:", &prescription.patient_mobile);
    page.field("Date:", &dd_mm_yyyy(prescription.date));

    page.heading("DIAGNOSIS");
    page.paragraph(&prescription.diagnosis, 0.0);

    page.heading("Rx");
    for (i, item) in prescription.complete_items().enumerate() {
        page.line(&format!("{}. {}", i + 1, item.medicine.trim()));
        page.paragraph(
            &format!("{} for {}", item.dosage.trim(), item.duration.trim()),
            5.0,
        );
        if !item.instructions.trim().is_empty() {
            page.paragraph(&item.instructions, 5.0);
        }
        page.gap(1.5);
    }

    if !prescription.notes.trim().is_empty() {
        page.heading("NOTES");
        page.paragraph(&prescription.notes, 0.0);
    }
    if let Some(next_visit) = prescription.next_visit_date {
        page.gap(2.0);
        page.field("Next visit:", &dd_mm_yyyy(next_visit));
    }

    let bytes = page.finish()?;
    debug!(patient = %prescription.patient_id, size = bytes.len(), "prescription rendered");
    Ok(bytes)
}
