/////////////////////////////////////////////////////////////////////////////////////
//
// Mask SIRD model
//
// utilities module
//
// various functions that can be of use across the app
//
////////////////////////////////////////////////////////////////////////////////////

// `samples` evenly spaced points from start to end, both ends included
pub fn linspace(start: f64, end: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (samples - 1) as f64;
            let mut points: Vec<f64> = (0..samples - 1)
                .map(|i| start + i as f64 * step)
                .collect();
            points.push(end); // land exactly on the end point
            points
        }
    }
}
