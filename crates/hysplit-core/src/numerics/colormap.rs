//! Piecewise-linear "jet" colormap sampled into hex colours.

type Segment = &'static [(f64, f64, f64)];

const JET_RED: Segment = &[
    (0.0, 0.0, 0.0),
    (0.35, 0.0, 0.0),
    (0.66, 1.0, 1.0),
    (0.89, 1.0, 1.0),
    (1.0, 0.5, 0.5),
];
const JET_GREEN: Segment = &[
    (0.0, 0.0, 0.0),
    (0.125, 0.0, 0.0),
    (0.375, 1.0, 1.0),
    (0.64, 1.0, 1.0),
    (0.91, 0.0, 0.0),
    (1.0, 0.0, 0.0),
];
const JET_BLUE: Segment = &[
    (0.0, 0.5, 0.5),
    (0.11, 1.0, 1.0),
    (0.34, 1.0, 1.0),
    (0.65, 0.0, 0.0),
    (1.0, 0.0, 0.0),
];

/// `count` colours evenly spaced along the colormap, as `#rrggbb`.
pub fn jet_hex_colors(count: usize) -> Vec<String> {
    (0..count)
        .map(|index| {
            let position = if count > 1 {
                index as f64 / (count - 1) as f64
            } else {
                0.0
            };
            hex_color(
                channel(JET_RED, position),
                channel(JET_GREEN, position),
                channel(JET_BLUE, position),
            )
        })
        .collect()
}

fn channel(segment: Segment, position: f64) -> f64 {
    let position = position.clamp(0.0, 1.0);
    for pair in segment.windows(2) {
        let (x0, _, right0) = pair[0];
        let (x1, left1, _) = pair[1];
        if position <= x1 {
            if x1 <= x0 {
                return left1;
            }
            return right0 + (position - x0) / (x1 - x0) * (left1 - right0);
        }
    }
    segment.last().map_or(0.0, |(_, left, _)| *left)
}

fn hex_color(red: f64, green: f64, blue: f64) -> String {
    let byte = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", byte(red), byte(green), byte(blue))
}
