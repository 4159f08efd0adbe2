use crate::{Span, Spanned};
use std::ops::Deref;

/// Errors from import loaders or the driver may not point into any file.
#[derive(Debug)]
pub enum MaybeSpanned<T> {
    WithoutSpan(T),
    WithSpan(Spanned<T>),
}

impl<T> MaybeSpanned<T> {
    pub fn span(&self) -> Option<&Span> {
        match self {
            MaybeSpanned::WithoutSpan(_) => None,
            MaybeSpanned::WithSpan(spanned) => Some(&spanned.span),
        }
    }
}

impl<T> Deref for MaybeSpanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            MaybeSpanned::WithoutSpan(data) => data,
            MaybeSpanned::WithSpan(spanned) => &spanned.data,
        }
    }
}
