use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Widget {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct WidgetPage {
    pub items: Vec<Widget>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWidget {
    pub name: String,
}

pub type WidgetId = u64;

#[cfg(test)]
mod tests {
    pub struct Widget;
}
