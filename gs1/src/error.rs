// Copyright 2022 Oxide Computer Company

use crate::lint::LintErr;
use colored::Colorize;
use std::fmt;

/// Every distinct failure the engine can report. Parse-time kinds are
/// grouped by the subsystem that detects them; the message carried by
/// [`Gs1Error`] names the offending AI or input fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    //
    // table-time
    //
    AiTableBrokenPrefixesDifferInLength,
    AiTableBadAttribute,

    //
    // bracketed parse
    //
    AiUnrecognised,
    AiParseFailed,
    AiContainsIllegalCaratCharacter,
    AiValueIsTooShort,
    AiValueIsTooLong,
    AiDataIsEmpty,
    AiDataHasIncorrectLength,
    TooManyAis,

    //
    // unbracketed processing
    //
    MissingFnc1InFirstPosition,
    AiDataEmpty,
    NoAiForPrefix,
    AiDataIsTooLong,

    //
    // linting
    //
    AiLinterError,

    //
    // DL URI parse
    //
    UriContainsIllegalCharacters,
    UriContainsIllegalScheme,
    UriMissingDomainAndPathInfo,
    DomainContainsIllegalCharacters,
    NoGs1DlKeysFoundInPathInfo,
    AiValuePathElementIsEmpty,
    AiValueQueryElementIsEmpty,
    DecodedAiFromDlPathInfoContainsIllegalNull,
    DecodedAiValueFromQueryParamsContainsIllegalNull,
    UnknownAiInQueryParams,
    InvalidKeyQualifierSequence,
    DuplicateAi,
    AiIsNotValidDataAttribute,
    AiShouldBeInPathInfo,
    DlUriParseFailed,

    //
    // cross-AI validation
    //
    InvalidAiPairs,
    RequiredAisNotSatisfied,
    InstancesOfAiHaveDifferentValues,
    SerialNotPresent,

    //
    // DL URI generation
    //
    CannotCreateDlUriWithoutPrimaryKeyAi,

    //
    // API
    //
    InputTooLong,
    ValidationLocked,
}

/// An engine failure: a kind, a pre-formatted message, and, for linter
/// failures, the linter code plus a positional markup string of the form
/// `(AI)prefix|bad|suffix` framing the offending characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Gs1Error {
    /// What failed.
    pub kind: ErrorKind,

    /// Human-readable description naming the offending AI or fragment.
    pub message: String,

    /// The linter code behind an `AiLinterError`.
    pub lint: Option<LintErr>,

    /// Byte-accurate error markup for linter failures.
    pub markup: Option<String>,
}

impl Gs1Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            lint: None,
            markup: None,
        }
    }

    pub(crate) fn linter(
        message: impl Into<String>,
        lint: LintErr,
        markup: String,
    ) -> Self {
        Self {
            kind: ErrorKind::AiLinterError,
            message: message.into(),
            lint: Some(lint),
            markup: Some(markup),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The linter markup with the `|bad|` range highlighted, for terminal
    /// display.
    pub fn rendered_markup(&self) -> Option<String> {
        let markup = self.markup.as_deref()?;
        let (prefix, rest) = markup.split_once('|')?;
        let (bad, suffix) = rest.split_once('|')?;
        Some(format!(
            "{}{}{}",
            prefix,
            bad.bright_red().bold(),
            suffix
        ))
    }
}

impl fmt::Display for Gs1Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            "error".bright_red(),
            self.message.as_str().bright_white().bold()
        )?;
        if let Some(m) = self.rendered_markup() {
            write!(f, "\n  {}", m)?;
        }
        Ok(())
    }
}

impl std::error::Error for Gs1Error {}
