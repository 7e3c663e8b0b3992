pub mod widgets;

pub use widgets::WidgetHandler;

pub trait Health {
    fn health(&self) -> bool;
}
