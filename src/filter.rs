use crate::{
    catalog::{Catalog, Item, ALL_CATEGORIES},
    mode::Mode,
    status::{StatusRecord, StatusStore},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewFilter {
    #[default]
    All,
    HideOwned,
    MissingOnly,
}

impl ViewFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(ViewFilter::All),
            "hide-owned" | "hideowned" => Some(ViewFilter::HideOwned),
            "missing" | "missing-only" | "missingonly" => Some(ViewFilter::MissingOnly),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewFilter::All => "All",
            ViewFilter::HideOwned => "Hide owned",
            ViewFilter::MissingOnly => "Missing only",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ViewFilter::All => ViewFilter::HideOwned,
            ViewFilter::HideOwned => ViewFilter::MissingOnly,
            ViewFilter::MissingOnly => ViewFilter::All,
        }
    }

    // MissingOnly has no extra criterion yet; it hides owned items exactly
    // like HideOwned.
    fn admits(self, record: &StatusRecord) -> bool {
        match self {
            ViewFilter::All => true,
            ViewFilter::HideOwned | ViewFilter::MissingOnly => !record.owned,
        }
    }
}

/// Ephemeral view settings. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub search_text: String,
    /// `None` means every category.
    pub selected_category: Option<String>,
    pub view_filter: ViewFilter,
    pub mode: Mode,
}

impl ViewState {
    /// Empty input and the "All Categories" sentinel both clear the filter.
    pub fn set_category(&mut self, category: &str) {
        self.selected_category = if category.is_empty() || category == ALL_CATEGORIES {
            None
        } else {
            Some(category.to_string())
        };
    }

    pub fn category_label(&self) -> &str {
        self.selected_category.as_deref().unwrap_or(ALL_CATEGORIES)
    }
}

pub fn is_visible(item: &Item, record: &StatusRecord, view: &ViewState) -> bool {
    if let Some(category) = &view.selected_category {
        if item.category != *category {
            return false;
        }
    }

    let query = view.search_text.trim().to_lowercase();
    if !query.is_empty()
        && !item.name.to_lowercase().contains(&query)
        && !item.category.to_lowercase().contains(&query)
    {
        return false;
    }

    view.view_filter.admits(record)
}

/// Recomputes the full visible list in catalog order.
pub fn visible_items<'a>(
    catalog: &'a Catalog,
    store: &StatusStore,
    view: &ViewState,
) -> Vec<&'a Item> {
    catalog
        .items()
        .iter()
        .filter(|item| is_visible(item, &store.peek(&item.id), view))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusField;

    fn goku() -> Item {
        Item {
            id: "a".to_string(),
            name: "Goku".to_string(),
            category: "STR".to_string(),
            icon: None,
        }
    }

    fn owned() -> StatusRecord {
        StatusRecord {
            owned: true,
            ..StatusRecord::default()
        }
    }

    #[test]
    fn hide_owned_hides_owned_items() {
        let view = ViewState {
            view_filter: ViewFilter::HideOwned,
            ..ViewState::default()
        };
        assert!(!is_visible(&goku(), &owned(), &view));
        assert!(is_visible(&goku(), &StatusRecord::default(), &view));
    }

    #[test]
    fn all_shows_everything() {
        let view = ViewState::default();
        assert!(is_visible(&goku(), &owned(), &view));
        assert!(is_visible(&goku(), &StatusRecord::default(), &view));
    }

    #[test]
    fn missing_only_currently_matches_hide_owned() {
        let hide = ViewState {
            view_filter: ViewFilter::HideOwned,
            ..ViewState::default()
        };
        let missing = ViewState {
            view_filter: ViewFilter::MissingOnly,
            ..ViewState::default()
        };
        for record in [owned(), StatusRecord::default()] {
            assert_eq!(
                is_visible(&goku(), &record, &hide),
                is_visible(&goku(), &record, &missing)
            );
        }
    }

    #[test]
    fn search_matches_name_or_category_case_insensitively() {
        let record = StatusRecord::default();
        let mut view = ViewState::default();

        view.search_text = "  gOK ".to_string();
        assert!(is_visible(&goku(), &record, &view));

        view.search_text = "str".to_string();
        assert!(is_visible(&goku(), &record, &view));

        view.search_text = "vegeta".to_string();
        assert!(!is_visible(&goku(), &record, &view));

        view.search_text = "   ".to_string();
        assert!(is_visible(&goku(), &record, &view));
    }

    #[test]
    fn category_is_exact_and_case_sensitive() {
        let record = StatusRecord::default();
        let mut view = ViewState::default();

        view.set_category("str");
        assert!(!is_visible(&goku(), &record, &view));

        view.set_category("STR");
        assert!(is_visible(&goku(), &record, &view));

        view.set_category(ALL_CATEGORIES);
        assert_eq!(view.selected_category, None);
        assert!(is_visible(&goku(), &record, &view));
    }

    #[test]
    fn filters_combine_with_and() {
        let mut view = ViewState {
            search_text: "goku".to_string(),
            view_filter: ViewFilter::HideOwned,
            ..ViewState::default()
        };
        view.set_category("STR");
        assert!(is_visible(&goku(), &StatusRecord::default(), &view));
        assert!(!is_visible(&goku(), &owned(), &view));
    }

    #[test]
    fn visible_items_keeps_catalog_order() {
        let catalog = Catalog::from_json(
            r#"[{"id":"1","name":"Goku","category":"STR"},
                {"id":"2","name":"Vegeta","category":"AGL"},
                {"id":"3","name":"Gohan","category":"STR"}]"#,
        )
        .unwrap();
        let mut store = StatusStore::new();
        store.set_field("3", StatusField::Owned(true));
        let view = ViewState {
            view_filter: ViewFilter::MissingOnly,
            ..ViewState::default()
        };
        let ids: Vec<&str> = visible_items(&catalog, &store, &view)
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
