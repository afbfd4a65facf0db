// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Errors raised while dispatching and running a sketch command.

use std::fmt;

use ds_sketches::error::ErrorView;

/// ErrorKind is all kinds of Error raised by the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The flags of a sub-command could not be parsed.
    OptionParse,
    /// A file or standard stream could not be read or written.
    Io,
    /// An input line or query value is not a valid number or weight.
    ValueParse,
    /// The first token names no sketch kind.
    UnrecognizedCommand,
    /// The sketch library rejected serialized bytes or an operation.
    InvalidSketch,
    /// A sizing option is out of range or malformed.
    ConfigInvalid,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::OptionParse => "OptionParse",
            ErrorKind::Io => "Io",
            ErrorKind::ValueParse => "ValueParse",
            ErrorKind::UnrecognizedCommand => "UnrecognizedCommand",
            ErrorKind::InvalidSketch => "InvalidSketch",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by every phase of a run.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),
            source: None,
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Set source for error.
    ///
    /// # Panics
    ///
    /// Panics if the source has been set.
    pub fn set_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(src.into());
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    ///
    /// For [`ErrorKind::ValueParse`] this is the offending input text.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl Error {
    pub(crate) fn option_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OptionParse, message)
    }

    pub(crate) fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, message).set_source(err)
    }

    pub(crate) fn value_parse(item: &str, reason: impl ToString) -> Self {
        Self::new(ErrorKind::ValueParse, item).with_context("reason", reason)
    }

    pub(crate) fn unrecognized_command(token: &str) -> Self {
        Self::new(ErrorKind::UnrecognizedCommand, token)
    }

    pub(crate) fn invalid_sketch(err: ds_sketches::error::Error) -> Self {
        Self::new(ErrorKind::InvalidSketch, err.message().to_string()).set_source(err)
    }

    pub(crate) fn config_invalid(option: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message).with_context("option", option)
    }
}

impl Error {
    fn view(&self) -> ErrorView<'_, ErrorKind> {
        ErrorView {
            kind: self.kind,
            message: &self.message,
            context: &self.context,
            source: self.source.as_ref(),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.view(), f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parse_keeps_item_as_message() {
        let err = Error::value_parse("12x", "invalid digit found in string");
        assert_eq!(err.kind(), ErrorKind::ValueParse);
        assert_eq!(err.message(), "12x");
        assert_eq!(
            err.to_string(),
            "ValueParse, context: { reason: invalid digit found in string } => 12x"
        );
    }

    #[test]
    fn test_debug_lists_context_and_source() {
        let err = Error::io(
            "cannot write to output stream",
            std::io::Error::other("broken pipe"),
        );
        let debug = format!("{err:?}");
        assert!(debug.starts_with("Io => cannot write to output stream\n"));
        assert!(debug.contains("Source:\n   broken pipe"));

        let err = Error::config_invalid("lgk", "out of range");
        assert!(format!("{err:?}").contains("Context:\n   option: lgk\n"));
    }

    #[test]
    fn test_config_invalid_names_option() {
        let err = Error::config_invalid("lgk", "lgk must be in [4, 21], got 30");
        assert_eq!(
            err.to_string(),
            "ConfigInvalid, context: { option: lgk } => lgk must be in [4, 21], got 30"
        );
    }
}
