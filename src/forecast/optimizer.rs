//! Bounded Nelder-Mead simplex minimiser
//!
//! Shared by the ARIMA conditional-sum-of-squares fit, the Holt smoothing
//! fit, and the bathtub curve fit. Box bounds are enforced by clamping
//! candidate vertices before evaluation.

/// Minimise `f` from `x0` subject to per-dimension bounds.
///
/// Returns the best vertex found; falls back to the (clamped) starting point
/// when the objective is not finite there or the dimension is degenerate.
pub fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    max_evals: usize,
) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    const ALPHA: f64 = 1.0; // reflection
    const GAMMA: f64 = 2.0; // expansion
    const RHO: f64 = 0.5; // contraction
    const SIGMA: f64 = 0.5; // shrink
    const TOL: f64 = 1e-10;

    let n = x0.len();
    debug_assert_eq!(lower.len(), n);
    debug_assert_eq!(upper.len(), n);

    let clamp = |x: &mut Vec<f64>| {
        for i in 0..n {
            x[i] = x[i].clamp(lower[i], upper[i]);
        }
    };

    let mut start = x0.to_vec();
    clamp(&mut start);
    if n == 0 || !f(&start).is_finite() {
        return start;
    }

    // Initial simplex: start plus a perturbation of each coordinate,
    // proportional to the bound range
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let range = upper[i] - lower[i];
        let step = if range.is_finite() && range > 0.0 {
            range * 0.05
        } else {
            0.1 + vertex[i].abs() * 0.05
        };
        vertex[i] += step;
        clamp(&mut vertex);
        if (vertex[i] - start[i]).abs() < 1e-12 {
            vertex[i] = (start[i] - step).clamp(lower[i], upper[i]);
        }
        simplex.push(vertex);
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();
    let mut evals = values.len();

    while evals < max_evals {
        // Order vertices by objective value
        let mut order: Vec<usize> = (0..simplex.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let simplex_sorted: Vec<Vec<f64>> = order.iter().map(|&i| simplex[i].clone()).collect();
        let values_sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        simplex = simplex_sorted;
        values = values_sorted;

        if (values[n] - values[0]).abs() < TOL {
            break;
        }

        // Centroid of all but the worst
        let mut centroid = vec![0.0; n];
        for vertex in simplex.iter().take(n) {
            for i in 0..n {
                centroid[i] += vertex[i] / n as f64;
            }
        }

        // Reflection
        let mut reflected: Vec<f64> = (0..n)
            .map(|i| centroid[i] + ALPHA * (centroid[i] - simplex[n][i]))
            .collect();
        clamp(&mut reflected);
        let f_reflected = f(&reflected);
        evals += 1;

        if f_reflected < values[0] {
            // Expansion
            let mut expanded: Vec<f64> = (0..n)
                .map(|i| centroid[i] + GAMMA * (reflected[i] - centroid[i]))
                .collect();
            clamp(&mut expanded);
            let f_expanded = f(&expanded);
            evals += 1;

            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        // Contraction toward the better of worst/reflected
        let (toward, f_toward) = if f_reflected < values[n] {
            (&reflected, f_reflected)
        } else {
            (&simplex[n], values[n])
        };
        let mut contracted: Vec<f64> = (0..n)
            .map(|i| centroid[i] + RHO * (toward[i] - centroid[i]))
            .collect();
        clamp(&mut contracted);
        let f_contracted = f(&contracted);
        evals += 1;

        if f_contracted < f_toward {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // Shrink toward the best vertex
        let best = simplex[0].clone();
        for vertex in simplex.iter_mut().skip(1) {
            for i in 0..n {
                vertex[i] = best[i] + SIGMA * (vertex[i] - best[i]);
            }
            clamp(vertex);
        }
        for (vertex, value) in simplex.iter().zip(values.iter_mut()).skip(1) {
            *value = f(vertex);
            evals += 1;
        }
    }

    let mut best_idx = 0;
    for (i, v) in values.iter().enumerate() {
        if *v < values[best_idx] {
            best_idx = i;
        }
    }

    if values[best_idx].is_finite() {
        simplex.swap_remove(best_idx)
    } else {
        start
    }
}
