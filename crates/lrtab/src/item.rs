//! LR(0) items and the closure/goto operations over them.

use crate::{
    grammar::{Grammar, ProductionID, SymbolID},
    types::Set,
    util::display_fn,
};
use std::fmt;

/// The LR(0) item, a production with a dot position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionID,
    pub dot: u16,
}

impl Item {
    pub const fn new(production: ProductionID) -> Self {
        Self { production, dot: 0 }
    }

    /// Return the symbol just after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .right
            .get(usize::from(self.dot))
            .copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.dot) >= g.production(self.production).right.len()
    }

    /// Move the dot over the next symbol.
    pub fn advance(&self) -> Self {
        Self {
            dot: self.dot + 1,
            ..*self
        }
    }

    // `"C -> c . C"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} ->", g.nonterminal_name(production.left))?;
            for (i, symbol) in production.right.iter().enumerate() {
                if i == usize::from(self.dot) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.is_complete(g) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// An insertion-ordered set of items.
///
/// Two sets are equal when they hold the same items, whatever the order.
#[derive(Debug, Default, Clone)]
pub struct ItemSet {
    items: Set<Item>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.iter()
    }

    /// The canonical form used to identify the set.
    pub fn key(&self) -> Vec<Item> {
        let mut key: Vec<_> = self.items.iter().copied().collect();
        key.sort_unstable();
        key
    }

    /// The symbols appearing after a dot, in item order without duplicates.
    pub fn next_symbols(&self, g: &Grammar) -> Set<SymbolID> {
        self.items.iter().filter_map(|item| item.next_symbol(g)).collect()
    }
}

impl PartialEq for ItemSet {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.items.iter().all(|i| other.items.contains(i))
    }
}
impl Eq for ItemSet {}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = indexmap::set::Iter<'a, Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Calculate the closure of `items`.
///
/// Items are added in the order they are discovered, and the productions of
/// a nonterminal in their declaration order.
pub fn closure(g: &Grammar, items: &ItemSet) -> ItemSet {
    let mut result = items.clone();
    let mut index = 0;
    // `result` grows while walking it; the walk ends once no item is added.
    while let Some(item) = result.items.get_index(index).copied() {
        index += 1;
        if let Some(SymbolID::N(n)) = item.next_symbol(g) {
            for (id, _) in g.productions_of(n) {
                result.items.insert(Item::new(id));
            }
        }
    }
    result
}

/// Calculate the closed set of items reached from `items` over `symbol`.
///
/// An empty result means there is no transition.
pub fn goto(g: &Grammar, items: &ItemSet, symbol: SymbolID) -> ItemSet {
    let kernels: ItemSet = items
        .iter()
        .filter(|item| item.next_symbol(g) == Some(symbol))
        .map(Item::advance)
        .collect();
    if kernels.is_empty() {
        return kernels;
    }
    closure(g, &kernels)
}
