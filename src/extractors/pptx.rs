//! PowerPoint extraction on top of the structured slide reader.

use super::{ExtractionResult, Extras, StructuredData};
use crate::error::ExtractResult;
use crate::slides::{Slide, SlideDeck};

pub fn extract(data: &[u8]) -> ExtractResult<ExtractionResult> {
    let deck = SlideDeck::parse(data)?;

    let slides_with_notes = deck.slides.iter().filter(|s| s.notes.is_some()).count();
    let text = deck
        .slides
        .iter()
        .map(render_slide)
        .collect::<Vec<_>>()
        .join("\n\n");

    tracing::debug!(
        "PPTX: {} slides, {} with notes",
        deck.slides.len(),
        slides_with_notes
    );

    let extras = Extras {
        slide_count: Some(deck.slides.len()),
        slides_with_notes: Some(slides_with_notes),
        presentation_title: deck.title.clone(),
        presentation_author: deck.author.clone(),
        ..Default::default()
    };

    Ok(ExtractionResult::new(text, 0.95, "pptx-parser")
        .with_structured(StructuredData::Presentation {
            title: deck.title,
            author: deck.author,
            slides: deck.slides,
        })
        .with_extras(extras))
}

fn render_slide(slide: &Slide) -> String {
    let mut out = format!("Slide {}", slide.number);
    if let Some(title) = &slide.title {
        out.push_str(": ");
        out.push_str(title);
    }
    if !slide.body.is_empty() {
        out.push('\n');
        out.push_str(&slide.body);
    }
    if let Some(notes) = &slide.notes {
        out.push_str("\nNotes: ");
        out.push_str(notes);
    }
    out
}
