//! Symbol Dictionary
//!
//! Bidirectional name <-> dense id mapping for providers and instruments.
//! Ids are assigned in first-seen order starting at 0 with no gaps, so they can
//! index straight into the aggregation matrix.

use std::collections::HashMap;
use std::ops::Index;

/// Append-only name registry. Single writer.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    ids: HashMap<String, u32>,
    names: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register names in order; ids follow iteration order for unseen names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();
        for name in names {
            dict.id_for(name.as_ref());
        }
        dict
    }

    /// Id for `name`, allocating the next id if it was never seen.
    pub fn id_for(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        assert!(
            self.names.len() < u32::MAX as usize,
            "dictionary exceeded u32 id space"
        );
        let id = self.names.len() as u32;
        self.ids.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        id
    }

    /// Name registered for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never assigned.
    pub fn name_for(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// Non-panicking reverse lookup.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Id for a previously registered name, without inserting.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl Index<u32> for Dictionary {
    type Output = str;

    fn index(&self, id: u32) -> &str {
        self.name_for(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_for_is_idempotent() {
        let mut dict = Dictionary::new();
        let a = dict.id_for("binance");
        let b = dict.id_for("binance");
        assert_eq!(a, b);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_ids_follow_first_seen_order() {
        let mut dict = Dictionary::new();
        let names = ["kraken", "binance", "coinbase", "binance", "kraken", "okx"];
        let ids: Vec<u32> = names.iter().map(|n| dict.id_for(n)).collect();
        assert_eq!(ids, vec![0, 1, 2, 1, 0, 3]);
        assert_eq!(
            dict.names().collect::<Vec<_>>(),
            vec!["kraken", "binance", "coinbase", "okx"]
        );
    }

    #[test]
    fn test_reverse_lookup() {
        let dict = Dictionary::from_names(["BTC-USD", "ETH-USD"]);
        assert_eq!(dict.name_for(1), "ETH-USD");
        assert_eq!(&dict[0], "BTC-USD");
        assert_eq!(dict.get(2), None);
        assert_eq!(dict.lookup("ETH-USD"), Some(1));
        assert_eq!(dict.lookup("SOL-USD"), None);
    }

    #[test]
    #[should_panic]
    fn test_name_for_unassigned_id_panics() {
        let dict = Dictionary::from_names(["only"]);
        let _ = dict.name_for(1);
    }

    #[test]
    fn test_many_names_are_dense() {
        let mut dict = Dictionary::new();
        for i in 0..1000u32 {
            assert_eq!(dict.id_for(&format!("symbol{}", i)), i);
        }
        assert_eq!(dict.len(), 1000);
    }
}
