pub mod results_view;
pub mod typing_area;
