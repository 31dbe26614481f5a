// Copyright 2022 Oxide Computer Company

//! The engine context: one mutable document state holding the AI table,
//! the configuration knobs, the normalized AI data buffer and the
//! extracted-AI table. A context is single-threaded; separate contexts may
//! be used on separate threads, and `Engine` is `Clone` for read-only
//! snapshot reuse.

use crate::ai::{AiEntry, AiEntryRef, AiTable, MAX_DATA};
use crate::dl;
use crate::elements;
use crate::error::{ErrorKind, Gs1Error};
use crate::validate::{self, Validation, ValidationTable};

/// Where an extracted AI sits in a GS1 Digital Link URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlPathOrder {
    /// The element appears (or would appear) among the query parameters.
    Attribute,
    /// Position within the DL path, zero-based from the primary key.
    Path(usize),
}

/// One entry of the extracted table: AI data, or a non-AI query parameter
/// from a DL URI retained verbatim.
#[derive(Debug, Clone)]
pub enum ExtractedAi {
    Ai(AiElement),
    DlIgnored(String),
}

/// An extracted AI element. The AI and value texts are spans into the
/// engine's normalized buffer; resolve them with [`AiElement::ai`] and
/// [`AiElement::value`] against [`Engine::data_str`].
#[derive(Debug, Clone)]
pub struct AiElement {
    pub entry: AiEntryRef,
    pub(crate) ai_start: usize,
    pub(crate) ai_len: usize,
    pub(crate) val_start: usize,
    pub(crate) val_len: usize,
    pub(crate) dl_path_order: DlPathOrder,
}

impl AiElement {
    pub fn ai<'a>(&self, data: &'a str) -> &'a str {
        &data[self.ai_start..self.ai_start + self.ai_len]
    }

    pub fn value<'a>(&self, data: &'a str) -> &'a str {
        &data[self.val_start..self.val_start + self.val_len]
    }

    pub fn dl_path_order(&self) -> DlPathOrder {
        self.dl_path_order
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) table: AiTable,
    pub(crate) permit_unknown_ais: bool,
    pub(crate) permit_zero_suppressed_gtin_in_dl_uris: bool,
    pub(crate) validations: ValidationTable,

    /// The normalized AI data with `^` = FNC1.
    pub(crate) data_str: String,

    /// AI elements extracted by the most recent ingest.
    pub(crate) extracted: Vec<ExtractedAi>,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            table: AiTable::embedded(),
            permit_unknown_ais: false,
            permit_zero_suppressed_gtin_in_dl_uris: false,
            validations: ValidationTable::new(),
            data_str: String::new(),
            extracted: Vec::new(),
        }
    }

    /// Swap in a new AI table. A table that fails to build leaves the
    /// engine on the embedded table and reports why the supplied table was
    /// rejected; a broken embedded table is a programmer error.
    pub fn set_ai_table(
        &mut self,
        entries: Vec<AiEntry>,
    ) -> Result<(), Gs1Error> {
        match AiTable::new(entries) {
            Ok(table) => {
                self.table = table;
                Ok(())
            }
            Err(e) => {
                self.table = AiTable::embedded();
                Err(e)
            }
        }
    }

    pub fn ai_table(&self) -> &AiTable {
        &self.table
    }

    //
    // configuration knobs
    //

    pub fn permit_unknown_ais(&self) -> bool {
        self.permit_unknown_ais
    }

    pub fn set_permit_unknown_ais(&mut self, permit: bool) {
        self.permit_unknown_ais = permit;
    }

    pub fn permit_zero_suppressed_gtin_in_dl_uris(&self) -> bool {
        self.permit_zero_suppressed_gtin_in_dl_uris
    }

    pub fn set_permit_zero_suppressed_gtin_in_dl_uris(&mut self, permit: bool) {
        self.permit_zero_suppressed_gtin_in_dl_uris = permit;
    }

    pub fn validation_enabled(&self, v: Validation) -> bool {
        self.validations.enabled(v)
    }

    /// Toggle a cross-AI validation. Locked validations cannot be toggled.
    pub fn set_validation_enabled(
        &mut self,
        v: Validation,
        enabled: bool,
    ) -> Result<(), Gs1Error> {
        self.validations.set_enabled(v, enabled)
    }

    //
    // ingest operations: each fails atomically, clearing the normalized
    // buffer and the extracted table on error
    //

    /// Ingest a bracketed AI element string such as
    /// `(01)12345678901231(10)ABC123`.
    pub fn set_ai_data(&mut self, ai_data: &str) -> Result<(), Gs1Error> {
        self.ingest(ai_data.len(), |eng| {
            elements::parse_ai_data(eng, ai_data)?;
            validate::validate_ais(eng)
        })
    }

    /// Ingest unbracketed AI data (`^` = FNC1 in first position).
    pub fn set_data(&mut self, data: &str) -> Result<(), Gs1Error> {
        self.ingest(data.len(), |eng| {
            eng.data_str.push_str(data);
            elements::process_ai_data(eng, true)?;
            validate::validate_ais(eng)
        })
    }

    /// Ingest a GS1 Digital Link URI.
    pub fn set_dl_uri(&mut self, uri: &str) -> Result<(), Gs1Error> {
        self.ingest(uri.len(), |eng| {
            dl::parse_dl_uri(eng, uri)?;
            validate::validate_ais(eng)
        })
    }

    fn ingest(
        &mut self,
        input_len: usize,
        f: impl FnOnce(&mut Self) -> Result<(), Gs1Error>,
    ) -> Result<(), Gs1Error> {
        self.data_str.clear();
        self.extracted.clear();
        if input_len > MAX_DATA {
            return Err(Gs1Error::new(
                ErrorKind::InputTooLong,
                "input exceeds the maximum data length",
            ));
        }
        match f(self) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.data_str.clear();
                self.extracted.clear();
                Err(e)
            }
        }
    }

    //
    // accessors and renderers
    //

    /// The normalized AI data from the most recent successful ingest.
    pub fn data_str(&self) -> &str {
        &self.data_str
    }

    /// Render the extracted table as a bracketed AI element string.
    pub fn ai_data_str(&self) -> String {
        elements::render_ai_data(self)
    }

    /// Generate a GS1 Digital Link URI from the extracted table. A `None`
    /// stem produces the canonical `https://id.gs1.org` form.
    pub fn dl_uri(&mut self, stem: Option<&str>) -> Result<String, Gs1Error> {
        dl::generate_dl_uri(self, stem)
    }

    pub fn extracted(&self) -> &[ExtractedAi] {
        &self.extracted
    }

    pub fn ai_elements(&self) -> impl Iterator<Item = &AiElement> {
        self.extracted.iter().filter_map(|x| match x {
            ExtractedAi::Ai(el) => Some(el),
            ExtractedAi::DlIgnored(_) => None,
        })
    }

    /// Non-AI query parameters retained verbatim from the most recent DL
    /// URI ingest.
    pub fn dl_ignored_query_params(&self) -> Vec<&str> {
        self.extracted
            .iter()
            .filter_map(|x| match x {
                ExtractedAi::DlIgnored(s) => Some(s.as_str()),
                ExtractedAi::Ai(_) => None,
            })
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
