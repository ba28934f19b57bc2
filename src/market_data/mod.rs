pub mod aggregator;
pub mod candle;
pub mod liquidity;
pub mod source;

pub use aggregator::{aggregate, AggregatedCandle, PeriodKey, ViewScope};
pub use candle::Candle;
pub use liquidity::annotate_liquidity;
pub use source::CandleSource;
