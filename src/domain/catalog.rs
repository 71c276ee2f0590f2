//! Registry of constructible indicator implementations.
//!
//! Each indicator module contributes a [`FactoryDescriptor`] through an explicit
//! `register` function; there is no runtime type scanning. The catalog is built
//! once by the host and then only read.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use tracing::debug;

use crate::domain::construction::BoundArgs;
use crate::domain::error::{CatalogError, ConstructionFailure};
use crate::domain::indicator::{self, IndicatorRef};

/// A closed set of named values an `Enum` parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumKind {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

impl EnumKind {
    /// Case-insensitive lookup, returning the declared spelling.
    pub fn lookup(&self, text: &str) -> Option<&'static str> {
        self.values
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    SequenceHandle,
    IndicatorHandle,
    Int,
    Double,
    Boolean,
    NumericValue,
    Enum(EnumKind),
    /// A parameter that cannot be supplied from expression text.
    Unsupported(&'static str),
}

impl ParameterKind {
    pub fn is_standard(&self) -> bool {
        !matches!(self, ParameterKind::Unsupported(_))
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::SequenceHandle => write!(f, "BarSeries"),
            ParameterKind::IndicatorHandle => write!(f, "Indicator"),
            ParameterKind::Int => write!(f, "int"),
            ParameterKind::Double => write!(f, "double"),
            ParameterKind::Boolean => write!(f, "boolean"),
            ParameterKind::NumericValue => write!(f, "Num"),
            ParameterKind::Enum(kind) => write!(f, "{}", kind.name),
            ParameterKind::Unsupported(name) => write!(f, "{name}"),
        }
    }
}

pub type Factory = fn(&BoundArgs) -> Result<IndicatorRef, ConstructionFailure>;

/// One accepted parameter list and the factory that consumes it.
#[derive(Clone)]
pub struct Signature {
    pub params: Vec<ParameterKind>,
    pub factory: Factory,
}

impl Signature {
    pub fn new(params: Vec<ParameterKind>, factory: Factory) -> Self {
        Self { params, factory }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn has_boolean(&self) -> bool {
        self.params.contains(&ParameterKind::Boolean)
    }

    pub fn is_standard(&self) -> bool {
        self.params.iter().all(ParameterKind::is_standard)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature{self}")
    }
}

#[derive(Debug, Clone)]
pub struct FactoryDescriptor {
    pub canonical_name: String,
    pub type_name: &'static str,
    pub signatures: Vec<Signature>,
    /// False for types meant only for programmatic construction.
    pub externally_constructible: bool,
}

impl FactoryDescriptor {
    /// Usable from expression text.
    pub fn is_available(&self) -> bool {
        self.externally_constructible
            && !self.signatures.is_empty()
            && self.signatures.iter().all(Signature::is_standard)
    }
}

/// Derive the expression-facing name of an implementation type.
///
/// `SMAIndicator` -> `sma`, `BollingerBandsUpperIndicator` -> `bollinger_bands_upper`.
pub fn canonical_name(type_name: &str) -> String {
    let simple = type_name.strip_suffix("Indicator").unwrap_or(type_name);
    let chars: Vec<char> = simple.chars().collect();
    let mut out = String::with_capacity(simple.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && chars[i - 1].is_lowercase() && c.is_uppercase() {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    descriptors: BTreeMap<String, FactoryDescriptor>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type usable from expression text.
    pub fn register(
        &mut self,
        type_name: &'static str,
        signatures: Vec<Signature>,
    ) -> Result<&mut Self, CatalogError> {
        self.insert(type_name, signatures, true)
    }

    /// Register a type that only code can construct.
    pub fn register_internal(
        &mut self,
        type_name: &'static str,
        signatures: Vec<Signature>,
    ) -> Result<&mut Self, CatalogError> {
        self.insert(type_name, signatures, false)
    }

    fn insert(
        &mut self,
        type_name: &'static str,
        signatures: Vec<Signature>,
        externally_constructible: bool,
    ) -> Result<&mut Self, CatalogError> {
        let name = canonical_name(type_name);
        if let Some(existing) = self.descriptors.get(&name) {
            return Err(CatalogError::DuplicateName {
                name,
                first: existing.type_name.to_string(),
                second: type_name.to_string(),
            });
        }
        let signatures: Vec<Signature> =
            signatures.into_iter().filter(|s| s.arity() > 0).collect();
        debug!(name = %name, type_name, signatures = signatures.len(), "registered indicator");
        self.descriptors.insert(
            name.clone(),
            FactoryDescriptor {
                canonical_name: name,
                type_name,
                signatures,
                externally_constructible,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            all: self.descriptors,
            available: OnceLock::new(),
        }
    }
}

/// Read-only set of indicator descriptors keyed by canonical name.
#[derive(Debug)]
pub struct Catalog {
    all: BTreeMap<String, FactoryDescriptor>,
    available: OnceLock<BTreeMap<String, FactoryDescriptor>>,
}

impl Catalog {
    /// Build the catalog of every indicator this crate ships.
    pub fn discover() -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::new();
        indicator::register_all(&mut builder)?;
        let catalog = builder.build();
        debug!(
            total = catalog.all.len(),
            available = catalog.available().len(),
            "indicator catalog built"
        );
        Ok(catalog)
    }

    pub fn all(&self) -> &BTreeMap<String, FactoryDescriptor> {
        &self.all
    }

    pub fn available(&self) -> &BTreeMap<String, FactoryDescriptor> {
        self.available.get_or_init(|| {
            self.all
                .iter()
                .filter(|(_, d)| d.is_available())
                .map(|(k, d)| (k.clone(), d.clone()))
                .collect()
        })
    }

    pub fn resolve(&self, name: &str) -> Option<&FactoryDescriptor> {
        self.available().get(name)
    }
}
