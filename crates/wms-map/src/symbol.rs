//! Shared symbol catalog.
//!
//! Layers reference symbols by name. The catalog is built once per process;
//! a symbol's index is its position in the catalog.

use serde::{Deserialize, Serialize};

/// Default edge length of preset symbols in pixels.
pub const DEFAULT_SYMBOL_SIZE: u32 = 10;

/// Pen-up marker inside vector symbol point lists.
pub const PEN_UP: (f64, f64) = (-99.0, -99.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Ellipse,
    Vector,
    Hatch,
}

impl SymbolKind {
    /// MapServer `TYPE` keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            SymbolKind::Ellipse => "ELLIPSE",
            SymbolKind::Vector => "VECTOR",
            SymbolKind::Hatch => "HATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub filled: bool,
    #[serde(default)]
    pub points: Vec<(f64, f64)>,
    /// Nominal size; hatch symbols are sized by their style instead.
    #[serde(default)]
    pub size: Option<u32>,
}

impl Symbol {
    fn vector(name: &str, filled: bool, points: &[(f64, f64)], size: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Vector,
            filled,
            points: points.to_vec(),
            size: Some(size),
        }
    }
}

/// An ordered, immutable list of symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolCatalog {
    symbols: Vec<Symbol>,
}

impl SymbolCatalog {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }

    /// The preset point and polygon symbols.
    pub fn presets(size: u32) -> Self {
        let symbols = vec![
            Symbol {
                name: "circle".to_string(),
                kind: SymbolKind::Ellipse,
                filled: true,
                points: vec![(1.0, 1.0)],
                size: Some(size),
            },
            Symbol::vector(
                "square",
                true,
                &[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)],
                size,
            ),
            Symbol::vector(
                "triangle",
                true,
                &[(0.0, 0.0), (14.0, 0.0), (7.0, 7.0), (0.0, 0.0)],
                size,
            ),
            Symbol::vector(
                "cross",
                false,
                &[(0.0, 0.0), (10.0, 10.0), PEN_UP, (0.0, 10.0), (10.0, 0.0)],
                size,
            ),
            Symbol::vector("diagonal", false, &[(0.0, 0.0), (10.0, 10.0)], size),
            Symbol {
                name: "hatch".to_string(),
                kind: SymbolKind::Hatch,
                filled: false,
                points: Vec::new(),
                size: None,
            },
        ];
        Self { symbols }
    }

    /// Presets followed by `custom`. A custom symbol whose name matches an
    /// earlier entry is still appended but never wins a lookup.
    pub fn with_custom(mut self, custom: impl IntoIterator<Item = Symbol>) -> Self {
        self.symbols.extend(custom);
        self
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_order_defines_indices() {
        let catalog = SymbolCatalog::presets(DEFAULT_SYMBOL_SIZE);
        let names: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["circle", "square", "triangle", "cross", "diagonal", "hatch"]);
        assert_eq!(catalog.index_of("cross"), Some(3));
        assert_eq!(catalog.index_of("hash"), None);
    }

    #[test]
    fn test_cross_uses_pen_up() {
        let catalog = SymbolCatalog::presets(12);
        let cross = catalog.get(catalog.index_of("cross").unwrap()).unwrap();
        assert!(!cross.filled);
        assert_eq!(cross.points[2], PEN_UP);
        assert_eq!(cross.size, Some(12));
    }

    #[test]
    fn test_custom_symbols_append() {
        let star = Symbol::vector("star", true, &[(0.0, 0.0), (5.0, 10.0), (10.0, 0.0)], 8);
        let catalog = SymbolCatalog::presets(DEFAULT_SYMBOL_SIZE).with_custom([star]);
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.index_of("star"), Some(6));
    }
}
