//! Submission gate for the product editor.
//!
//! Every rule is evaluated, every failure collected, then the caller branches
//! once: submit, or jump to the first failing tab.

use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;
use crate::domain::aggregates::{ImageCollection, ProductDraft, Variant};

/// Editor tabs, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section { Basic, Pricing, Images, Variants, Faqs }

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic", Self::Pricing => "pricing", Self::Images => "images",
            Self::Variants => "variants", Self::Faqs => "faqs",
        }
    }

    fn for_field(field: &str) -> Self {
        match field {
            "selling_price" | "cost_price" | "compare_at_price" => Self::Pricing,
            _ => Self::Basic,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: BTreeMap<Section, Vec<String>>,
    warnings: BTreeMap<Section, Vec<String>>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool { self.errors.is_empty() }
    pub fn errors(&self) -> &BTreeMap<Section, Vec<String>> { &self.errors }
    pub fn warnings(&self) -> &BTreeMap<Section, Vec<String>> { &self.warnings }
    pub fn errors_for(&self, section: Section) -> &[String] { self.errors.get(&section).map_or(&[], |v| v.as_slice()) }

    /// Tab the editor should switch to.
    pub fn first_failing_section(&self) -> Option<Section> { self.errors.keys().next().copied() }

    pub fn error(&mut self, section: Section, message: impl Into<String>) {
        self.errors.entry(section).or_default().push(message.into());
    }

    pub fn warn(&mut self, section: Section, message: impl Into<String>) {
        self.warnings.entry(section).or_default().push(message.into());
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter()
            .map(|(section, msgs)| format!("{}: {}", section.as_str(), msgs.join(", ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Basic and pricing fields only; enough to create a draft listing.
pub fn check_listing(draft: &ProductDraft) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Err(errors) = draft.validate() {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(name, _)| *name);
        for (field, errs) in fields {
            for e in errs.iter() {
                let message = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| format!("{} is invalid", field));
                report.error(Section::for_field(field), message);
            }
        }
    }
    report
}

/// Runs every rule over the editor state.
pub fn check_product(
    draft: &ProductDraft,
    product_images: &ImageCollection,
    variants: &[Variant],
    variant_has_image: impl Fn(&Variant) -> bool,
) -> ValidationReport {
    let mut report = check_listing(draft);

    if product_images.is_empty() {
        report.error(Section::Images, "Add at least one product image");
    }

    let missing = variants.iter().filter(|v| v.active && !variant_has_image(v)).count();
    if missing > 0 {
        report.warn(Section::Variants, format!("{} active variant(s) have no image", missing));
    }

    for (i, faq) in draft.faqs.iter().enumerate() {
        if faq.active && !faq.is_complete() {
            report.error(Section::Faqs, format!("FAQ {} needs both a question and an answer", i + 1));
        }
    }

    report
}
