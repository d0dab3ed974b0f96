pub mod backtest;
pub mod cointegration;
pub mod signals;
pub mod stationarity;
