pub mod forecast_chart;
pub mod header;
pub mod weather_visualizations;
