use crate::{catalog::Catalog, status::StatusStore};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub owned: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.owned as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.owned, self.total)
    }
}

/// Only catalog ids count; records for ids outside the catalog are ignored.
pub fn progress(catalog: &Catalog, store: &StatusStore) -> Progress {
    let owned = catalog.ids().filter(|id| store.peek(id).owned).count();
    Progress {
        owned,
        total: catalog.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::Item, status::StatusField};

    fn catalog(size: usize) -> Catalog {
        let items = (0..size)
            .map(|n| Item {
                id: format!("unit-{n}"),
                name: format!("Unit {n}"),
                category: "TEQ".to_string(),
                icon: None,
            })
            .collect();
        Catalog::new(items).unwrap()
    }

    #[test]
    fn counts_owned_catalog_items() {
        let catalog = catalog(10);
        let mut store = StatusStore::new();
        store.ensure(catalog.ids());
        for id in ["unit-1", "unit-4", "unit-9"] {
            store.set_field(id, StatusField::Owned(true));
        }
        store.set_field("not-in-catalog", StatusField::Owned(true));

        let progress = progress(&catalog, &store);
        assert_eq!((progress.owned, progress.total), (3, 10));
        assert_eq!(progress.to_string(), "3 / 10");
        assert!((progress.percent() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_catalog_is_zero_percent() {
        let progress = progress(&Catalog::default(), &StatusStore::new());
        assert_eq!(progress, Progress::default());
        assert_eq!(progress.percent(), 0.0);
    }
}
