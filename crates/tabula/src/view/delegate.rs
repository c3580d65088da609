//! Edit delegates: conversion between a cell's value and editor text.
//!
//! A delegate decides what an editor starts with and how the text a user
//! typed becomes an [`ItemData`] for the model. Delegates are attached per
//! column on a [`TableBinding`](super::TableBinding); columns without one use
//! [`TextDelegate`].

use crate::error::TransformError;
use crate::model::ItemData;

/// Converts between cell values and editor text.
pub trait EditDelegate: Send + Sync {
    /// Returns the text an editor opened on `current` starts with.
    fn editor_text(&self, current: &ItemData) -> String {
        current.to_string()
    }

    /// Parses editor text into the value committed to the model.
    ///
    /// An error rejects the edit; the model is not touched.
    fn parse(&self, text: &str, current: &ItemData) -> Result<ItemData, TransformError>;
}

/// Commits editor text verbatim as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDelegate;

impl EditDelegate for TextDelegate {
    fn parse(&self, text: &str, _current: &ItemData) -> Result<ItemData, TransformError> {
        Ok(ItemData::from(text))
    }
}

/// Commits editor text as an integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerDelegate;

impl EditDelegate for IntegerDelegate {
    fn parse(&self, text: &str, _current: &ItemData) -> Result<ItemData, TransformError> {
        text.trim()
            .parse::<i64>()
            .map(ItemData::Int)
            .map_err(|_| TransformError::new(format!("'{text}' is not an integer")))
    }
}

/// Restricts edits to a fixed list of choices.
#[derive(Debug, Clone, Default)]
pub struct ChoiceDelegate {
    choices: Vec<String>,
}

impl ChoiceDelegate {
    /// Creates a delegate accepting exactly `choices`.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the accepted choices.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

impl EditDelegate for ChoiceDelegate {
    fn parse(&self, text: &str, _current: &ItemData) -> Result<ItemData, TransformError> {
        if self.choices.iter().any(|choice| choice == text) {
            Ok(ItemData::from(text))
        } else {
            Err(TransformError::new(format!("'{text}' is not one of the choices")))
        }
    }
}
