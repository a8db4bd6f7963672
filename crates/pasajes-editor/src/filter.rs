/// Route scope applied to the list query.
///
/// `None` means every route. An empty string coming from the "all routes"
/// option is treated the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterController {
    active: Option<String>,
}

impl FilterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Returns true if the scope changed
    pub fn set_filter(&mut self, route_id: Option<String>) -> bool {
        let route_id = route_id.filter(|r| !r.is_empty());
        let changed = self.active != route_id;
        self.active = route_id;
        changed
    }
}
