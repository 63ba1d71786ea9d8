//! Fixed line colours.

/// Line series colours, used in order and then repeated.
pub const LINE_COLORS: [&str; 20] = [
    "#0057B6", "#5960EA", "#0A6ED1", "#2E7BD6", "#13C2C2", "#52C41A", "#FA8C16", "#F5222D",
    "#722ED1", "#EB2F96", "#1890FF", "#73D13D", "#FFC53D", "#FF4D4F", "#9254DE", "#FF7A45",
    "#36CFC9", "#597EF7", "#B37FEB", "#FF85C0",
];

/// Colour of the `index`-th series.
pub fn color_for(index: usize) -> &'static str {
    LINE_COLORS[index % LINE_COLORS.len()]
}
