//! PDF rendering of classifier prediction reports.
//!
//! Reports use the builtin Helvetica faces, which only cover WinAnsi. Turkish letters
//! outside that set are transliterated with [`sanitize_text`] before drawing.

use crate::classifier::ClassProbability;
use crate::constants::{DISPLAY_DATE_FORMAT, REPORT_TITLE};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use printpdf::*;
use std::io::BufWriter;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: Mm = Mm(280.0);
const BOTTOM: Mm = Mm(20.0);
const LEFT: Mm = Mm(20.0);
const LINE: Mm = Mm(8.0);

/// Everything printed on one prediction report.
#[derive(Clone, Debug)]
pub struct PredictionReport {
    pub patient_name: String,
    pub clinician: String,
    pub generated_at: DateTime<Utc>,
    /// Class probabilities, highest first; the first entry is the prediction.
    pub probabilities: Vec<ClassProbability>,
}

impl PredictionReport {
    pub fn top(&self) -> Option<&ClassProbability> {
        self.probabilities.first()
    }
}

/// Replaces Turkish letters the builtin PDF fonts cannot draw.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ı' => 'i',
            'İ' => 'I',
            'ş' => 's',
            'Ş' => 'S',
            'ç' => 'c',
            'Ç' => 'C',
            'ğ' => 'g',
            'Ğ' => 'G',
            'ü' => 'u',
            'Ü' => 'U',
            'ö' => 'o',
            'Ö' => 'O',
            other => other,
        })
        .collect()
}

/// Text lines of the report body, before sanitising.
fn report_lines(report: &PredictionReport) -> Vec<String> {
    let mut lines = vec![format!("Hasta Adı: {}", report.patient_name)];
    if let Some(top) = report.top() {
        lines.push(format!(
            "Tahmin Edilen Sendrom: {} (%{:.1})",
            top.class,
            top.probability * 100.0
        ));
    }
    lines.push(format!("Doktor: {}", report.clinician));
    lines.push(format!(
        "Tarih: {}",
        report.generated_at.format(DISPLAY_DATE_FORMAT)
    ));
    lines.push(String::new());
    lines.push("Tüm Olasılıklar:".to_string());
    for p in &report.probabilities {
        lines.push(format!("{}: %{}", p.class, p.percent()));
    }
    lines
}

pub fn render_prediction_pdf(report: &PredictionReport) -> CoreResult<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(REPORT_TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| CoreError::Report(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| CoreError::Report(format!("font error: {e}")))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = TOP;

    layer.use_text(REPORT_TITLE, 14.0, Mm(75.0), y, &bold);
    y -= Mm(16.0);

    for line in report_lines(report) {
        if y < BOTTOM {
            let (page, page_layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            y = TOP;
        }
        if !line.is_empty() {
            layer.use_text(sanitize_text(&line), 12.0, LEFT, y, &font);
        }
        y -= LINE;
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| CoreError::Report(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| CoreError::Report(format!("buffer error: {e}")))
}
