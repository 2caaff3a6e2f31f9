//! Server-driven option search for select and multi-select filters.

use std::fmt;

use super::FilterOption;

/// Identifies one search request; results for an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

type SearchCallback = Box<dyn FnMut(&str, SearchTicket) + Send>;

/// State of an async option search box.
///
/// The search box text is separate from the applied filter value: picking a
/// result or clearing the box resets the text but never touches the filter.
pub struct OptionSearch {
    text: String,
    loading: bool,
    generation: u64,
    options: Vec<FilterOption>,
    on_search_change: SearchCallback,
}

impl fmt::Debug for OptionSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSearch")
            .field("text", &self.text)
            .field("loading", &self.loading)
            .field("generation", &self.generation)
            .field("options", &self.options.len())
            .finish_non_exhaustive()
    }
}

impl OptionSearch {
    /// `on_search_change` receives every search text along with the ticket
    /// its results must be delivered under.
    pub fn new(
        initial: Vec<FilterOption>,
        on_search_change: impl FnMut(&str, SearchTicket) + Send + 'static,
    ) -> Self {
        Self {
            text: String::new(),
            loading: false,
            generation: 0,
            options: initial,
            on_search_change: Box::new(on_search_change),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether results are in flight; drives the loading affordance.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    /// Forwards new search text to the caller.
    pub fn input(&mut self, text: &str) -> SearchTicket {
        self.text = text.to_string();
        self.request()
    }

    /// Delivers results. Returns `false` (and ignores them) if a newer search
    /// has been issued since `ticket`.
    pub fn resolve(&mut self, ticket: SearchTicket, options: Vec<FilterOption>) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(?ticket, current = self.generation, "stale option results dropped");
            return false;
        }
        self.options = options;
        self.loading = false;
        true
    }

    /// Ends the loading state for a failed search, keeping previous options.
    pub fn fail(&mut self, ticket: SearchTicket) {
        if ticket.0 == self.generation {
            self.loading = false;
        }
    }

    /// Picks an option: resets the search box and hands back the value for
    /// the caller to apply as the filter.
    pub fn select(&mut self, value: &str) -> String {
        self.clear_search();
        value.to_string()
    }

    /// Empties the search box and asks for the unfiltered option list.
    pub fn clear_search(&mut self) {
        if self.text.is_empty() {
            return;
        }
        self.text.clear();
        self.request();
    }

    fn request(&mut self) -> SearchTicket {
        self.generation += 1;
        self.loading = true;
        let ticket = SearchTicket(self.generation);
        (self.on_search_change)(&self.text, ticket);
        ticket
    }
}
