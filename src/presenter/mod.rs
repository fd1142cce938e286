pub mod chart;
pub mod page;
pub mod sql;
pub mod table;

pub use chart::{ChartPoint, ChartSeries, ChartSpec};
pub use page::render_page;
pub use sql::usage_sql;
pub use table::TableView;
