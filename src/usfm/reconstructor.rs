/*!
 * Reassembly of a structural document from translated spans.
 */

use log::debug;

use super::model::{DocumentElement, ElementKind, ParsedDocument};

/// Rebuild a document, substituting translated spans into translatable lines
///
/// Markers and empty lines are emitted byte-identical. A translatable line
/// whose span is missing or blank keeps its original text, so content is
/// never dropped. Line breaks inside a translated span are collapsed to
/// spaces to keep the output line count equal to the input's.
pub fn reconstruct(elements: &[DocumentElement], translated_spans: &[String]) -> String {
    let mut output = String::with_capacity(elements.iter().map(|e| e.original_line.len() + 2).sum());
    let mut fallbacks = 0;

    for element in elements {
        match element.kind {
            ElementKind::Marker | ElementKind::Empty => output.push_str(&element.original_line),
            ElementKind::Translatable => {
                let translated = element
                    .translation_index
                    .and_then(|index| translated_spans.get(index))
                    .map(|span| flatten_span(span))
                    .filter(|span| !span.is_empty());

                match translated {
                    Some(text) => {
                        output.push_str(element.indentation());
                        output.push_str(element.prefix.as_deref().unwrap_or(""));
                        output.push_str(&text);
                    }
                    None => {
                        fallbacks += 1;
                        output.push_str(&element.original_line);
                    }
                }
            }
        }
        output.push_str(element.line_ending.as_str());
    }

    if fallbacks > 0 {
        debug!("{} translatable lines kept their original text", fallbacks);
    }

    output
}

/// Rebuild a parsed document with the given spans
pub fn reconstruct_document(document: &ParsedDocument, translated_spans: &[String]) -> String {
    reconstruct(&document.elements, translated_spans)
}

fn flatten_span(span: &str) -> String {
    span.split_whitespace().collect::<Vec<_>>().join(" ")
}
