//! Structured slide reader for .pptx packages.
//!
//! Produces the slide list (number, title, body, notes) and the deck's core
//! properties. The presentation extractor only summarizes what this returns.

use crate::error::{ExtractError, ExtractResult};
use crate::ooxml::{decode_entities, open_archive, part_names, read_optional_part, read_part, Archive};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("slide part regex is valid"));
static SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p:sp\b.*?</p:sp>").expect("shape regex is valid"));
static PLACEHOLDER_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<p:ph\b[^>]*\btype="([^"]*)""#).expect("placeholder regex is valid"));
static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:p(?:\s[^>]*)?>(.*?)</a:p>").expect("paragraph regex is valid"));
static RUN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a:t(?:\s[^>]*)?>([^<]*)</a:t>").expect("run regex is valid"));
static NOTES_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Target="\.\./notesSlides/(notesSlide\d+\.xml)""#).expect("notes target regex is valid")
});
static CORE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<dc:title>([^<]*)</dc:title>").expect("title regex is valid"));
static CORE_CREATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<dc:creator>([^<]*)</dc:creator>").expect("creator regex is valid"));

/// Placeholders that carry layout furniture rather than content.
const FURNITURE: &[&str] = &["sldNum", "sldImg", "dt", "ftr", "hdr"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub number: u32,
    pub title: Option<String>,
    pub body: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub title: Option<String>,
    pub author: Option<String>,
    pub slides: Vec<Slide>,
}

impl SlideDeck {
    pub fn parse(data: &[u8]) -> ExtractResult<Self> {
        let mut archive = open_archive(data)?;

        let mut numbered: Vec<(u32, String)> = part_names(&archive, &SLIDE_PART)
            .into_iter()
            .filter_map(|name| {
                let number = SLIDE_PART.captures(&name)?[1].parse().ok()?;
                Some((number, name))
            })
            .collect();
        if numbered.is_empty() {
            return Err(ExtractError::Malformed("presentation contains no slides".to_string()));
        }
        numbered.sort_by_key(|(n, _)| *n);

        let mut slides = Vec::with_capacity(numbered.len());
        for (number, part) in numbered {
            let xml = read_part(&mut archive, &part)?;
            let notes = read_notes(&mut archive, number)?;
            slides.push(parse_slide(number, &xml, notes));
        }

        let core = read_optional_part(&mut archive, "docProps/core.xml")?.unwrap_or_default();

        Ok(Self {
            title: capture_text(&CORE_TITLE, &core),
            author: capture_text(&CORE_CREATOR, &core),
            slides,
        })
    }
}

/// Split a slide into title and body text.
pub fn parse_slide(number: u32, xml: &str, notes: Option<String>) -> Slide {
    let mut title = None;
    let mut body = Vec::new();

    for shape in SHAPE.find_iter(xml) {
        let shape = shape.as_str();
        let placeholder = PLACEHOLDER_TYPE.captures(shape).map(|c| c[1].to_string());
        let text = shape_text(shape);
        if text.is_empty() {
            continue;
        }
        match placeholder.as_deref() {
            Some("title") | Some("ctrTitle") if title.is_none() => title = Some(text),
            Some(kind) if FURNITURE.contains(&kind) => {}
            _ => body.push(text),
        }
    }

    Slide {
        number,
        title,
        body: body.join("\n"),
        notes,
    }
}

/// Speaker notes, found through the slide's relationship part.
fn read_notes(archive: &mut Archive<'_>, number: u32) -> ExtractResult<Option<String>> {
    let rels_name = format!("ppt/slides/_rels/slide{}.xml.rels", number);
    let Some(rels) = read_optional_part(archive, &rels_name)? else {
        return Ok(None);
    };
    let Some(target) = NOTES_TARGET.captures(&rels).map(|c| c[1].to_string()) else {
        return Ok(None);
    };
    let Some(xml) = read_optional_part(archive, &format!("ppt/notesSlides/{}", target))? else {
        return Ok(None);
    };
    Ok(notes_text(&xml))
}

pub fn notes_text(xml: &str) -> Option<String> {
    let parts: Vec<String> = SHAPE
        .find_iter(xml)
        .map(|m| m.as_str())
        .filter(|shape| {
            PLACEHOLDER_TYPE
                .captures(shape)
                .map(|c| !FURNITURE.contains(&&c[1]))
                .unwrap_or(true)
        })
        .map(shape_text)
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

fn shape_text(shape: &str) -> String {
    PARAGRAPH
        .captures_iter(shape)
        .map(|p| {
            let runs: String = RUN_TEXT.captures_iter(&p[1]).map(|r| r[1].to_string()).collect();
            decode_entities(runs.trim())
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn capture_text(re: &Regex, xml: &str) -> Option<String> {
    re.captures(xml)
        .map(|c| decode_entities(c[1].trim()))
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::test_support::build_zip;

    fn slide_xml(title: &str, body: &[&str]) -> String {
        let paragraphs: String = body
            .iter()
            .map(|b| format!("<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>", b))
            .collect();
        format!(
            "<p:sld><p:cSld><p:spTree>\
             <p:sp><p:nvSpPr><p:nvPr><p:ph type=\"title\"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>\
             <p:sp><p:nvSpPr><p:nvPr><p:ph idx=\"1\"/></p:nvPr></p:nvSpPr><p:txBody>{}</p:txBody></p:sp>\
             <p:sp><p:nvSpPr><p:nvPr><p:ph type=\"sldNum\" idx=\"12\"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>7</a:t></a:r></a:p></p:txBody></p:sp>\
             </p:spTree></p:cSld></p:sld>",
            title, paragraphs
        )
    }

    #[test]
    fn test_parse_slide_title_and_body() {
        let xml = slide_xml("Benefits", &["Health plan", "Dental &amp; vision"]);
        let slide = parse_slide(3, &xml, None);
        assert_eq!(slide.number, 3);
        assert_eq!(slide.title.as_deref(), Some("Benefits"));
        assert_eq!(slide.body, "Health plan\nDental & vision");
    }

    #[test]
    fn test_notes_skip_furniture() {
        let xml = "<p:notes><p:sp><p:nvSpPr><p:nvPr><p:ph type=\"sldImg\"/></p:nvPr></p:nvSpPr></p:sp>\
                   <p:sp><p:nvSpPr><p:nvPr><p:ph type=\"body\" idx=\"1\"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>Mention the deadline</a:t></a:r></a:p></p:txBody></p:sp>\
                   <p:sp><p:nvSpPr><p:nvPr><p:ph type=\"sldNum\"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>2</a:t></a:r></a:p></p:txBody></p:sp></p:notes>";
        assert_eq!(notes_text(xml).as_deref(), Some("Mention the deadline"));
        assert_eq!(notes_text("<p:notes/>"), None);
    }

    #[test]
    fn test_parse_deck_orders_slides_numerically() {
        let s1 = slide_xml("Welcome", &["Agenda"]);
        let s2 = slide_xml("Policies", &["Remote work"]);
        let s10 = slide_xml("Questions", &[]);
        let notes = "<p:notes><p:sp><p:txBody><a:p><a:r><a:t>Smile</a:t></a:r></a:p></p:txBody></p:sp></p:notes>";
        let data = build_zip(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            (
                "ppt/slides/_rels/slide2.xml.rels",
                r#"<Relationships><Relationship Id="rId2" Target="../notesSlides/notesSlide1.xml"/></Relationships>"#,
            ),
            ("ppt/notesSlides/notesSlide1.xml", notes),
            (
                "docProps/core.xml",
                "<cp:coreProperties><dc:title>Onboarding</dc:title><dc:creator>People Ops</dc:creator></cp:coreProperties>",
            ),
        ]);

        let deck = SlideDeck::parse(&data).unwrap();
        let numbers: Vec<u32> = deck.slides.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(deck.slides[1].notes.as_deref(), Some("Smile"));
        assert_eq!(deck.slides[0].notes, None);
        assert_eq!(deck.title.as_deref(), Some("Onboarding"));
        assert_eq!(deck.author.as_deref(), Some("People Ops"));
    }

    #[test]
    fn test_deck_without_slides() {
        let data = build_zip(&[("ppt/presentation.xml", "<p:presentation/>")]);
        assert!(matches!(SlideDeck::parse(&data), Err(ExtractError::Malformed(_))));
    }
}
