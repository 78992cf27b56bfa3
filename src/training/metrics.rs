//! Evaluation metrics computed on held-out predictions

use ndarray::Array1;

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mse = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

/// Coefficient of determination. A constant target yields 0.0 unless the
/// predictions match it exactly.
pub fn r2(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// F1 averaged over classes, each class weighted by its support in `y_true`.
/// Labels are compared after rounding, matching the integer class encoding
/// used throughout training.
pub fn f1_weighted(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }

    let mut classes: Vec<i64> = y_true.iter().map(|v| v.round() as i64).collect();
    classes.sort_unstable();
    classes.dedup();

    let mut weighted = 0.0;
    for &class in &classes {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        let mut support = 0usize;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t_is = t.round() as i64 == class;
            let p_is = p.round() as i64 == class;
            if t_is {
                support += 1;
            }
            match (t_is, p_is) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        weighted += f1 * support as f64 / n as f64;
    }

    weighted
}

/// Area under the ROC curve for a binary target, from positive-class scores.
/// Rank-based (Mann-Whitney) with tied scores given averaged ranks.
/// Returns None when only one class is present.
pub fn roc_auc_binary(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t.round() as i64 == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign average ranks across ties
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(t, _)| t.round() as i64 == 1)
        .map(|(_, r)| r)
        .sum();

    let auc =
        (rank_sum_pos - n_pos as f64 * (n_pos as f64 + 1.0) / 2.0) / (n_pos as f64 * n_neg as f64);
    Some(auc)
}
