use crate::model::{CreateWidget, Widget, WidgetPage};
use crate::AppState;

pub struct WidgetHandler {
    state: AppState,
}

impl WidgetHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn list(&self, page: Option<u32>) -> WidgetPage {
        WidgetPage { items: vec![], next: None }
    }

    pub async fn create(&mut self, body: CreateWidget) -> Widget {
        Widget { id: 1, name: body.name }
    }
}

impl super::Health for &WidgetHandler {
    fn health(&self) -> bool {
        !self.state.db_url.is_empty()
    }
}

mod admin {
    pub struct Purge;

    impl Purge {
        pub fn run(self) {}
    }
}
