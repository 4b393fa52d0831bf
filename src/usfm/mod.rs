/*!
 * Structural markup handling.
 *
 * Line-oriented documents in a USFM-like format are split into typed
 * elements so that only the prose is sent for translation, and are then
 * rebuilt with every structural marker left untouched.
 *
 * - `model`: element and parsed document types
 * - `parser`: classification of lines and extraction of translatable spans
 * - `reconstructor`: re-emission of a document with translated spans
 */

pub mod model;
pub mod parser;
pub mod reconstructor;

pub use self::model::{DocumentElement, ElementKind, LineEnding, ParsedDocument};
pub use self::parser::parse_document;
pub use self::reconstructor::{reconstruct, reconstruct_document};
