//! Which fetch result is allowed to land.

use tabula_query::QueryState;

/// Permission to commit one fetch's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: QueryState,
}

/// Generation counter for loader invocations.
///
/// Requests are never cancelled. Each new query gets a fresh generation and
/// only the newest generation may commit, so results are keyed by request
/// rather than by arrival order.
#[derive(Debug, Clone, Default)]
pub struct FetchTracker {
    generation: u64,
    in_flight: Option<FetchTicket>,
    committed: Option<QueryState>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch for `query`.
    ///
    /// Returns `None` when the same query is already in flight, or is the
    /// last committed one and nothing is in flight.
    pub fn begin(&mut self, query: &QueryState) -> Option<FetchTicket> {
        match &self.in_flight {
            Some(ticket) if &ticket.query == query => return None,
            None if self.committed.as_ref() == Some(query) => return None,
            _ => {}
        }
        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            query: query.clone(),
        };
        if let Some(stale) = self.in_flight.replace(ticket.clone()) {
            tracing::debug!(
                superseded = stale.generation,
                generation = ticket.generation,
                "fetch superseded"
            );
        }
        Some(ticket)
    }

    /// Starts a fetch even if the query did not change (explicit refresh).
    pub fn begin_refresh(&mut self, query: &QueryState) -> FetchTicket {
        self.committed = None;
        self.in_flight = None;
        self.begin(query).unwrap_or_else(|| FetchTicket {
            generation: self.generation,
            query: query.clone(),
        })
    }

    /// Whether `ticket` is still the newest request; if so it is marked done.
    pub fn commit(&mut self, ticket: &FetchTicket) -> bool {
        match &self.in_flight {
            Some(current) if current.generation == ticket.generation => {
                self.in_flight = None;
                self.committed = Some(ticket.query.clone());
                true
            }
            _ => {
                tracing::debug!(
                    generation = ticket.generation,
                    latest = self.generation,
                    "stale fetch result discarded"
                );
                false
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn committed(&self) -> Option<&QueryState> {
        self.committed.as_ref()
    }
}
