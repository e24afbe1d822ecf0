//! Generalized Advantage Estimation over one rollout segment.
//!
//! `A_t = δ_t + γλ A_{t+1}` with `δ_t = r_t + γ V(s_{t+1}) − V(s_t)`, walked
//! backwards from the end of the segment. A step flagged done cuts both the
//! bootstrap value and the recursion, so one segment may hold several
//! episodes and stop in the middle of the last one.
//!
//! Schulman et al., "High-Dimensional Continuous Control Using Generalized
//! Advantage Estimation" (2016).

/// Advantages and λ-returns (`advantage + value`) for a segment.
///
/// `tail_value` is V of the state after the last step; it is ignored when the
/// last step is done. `rewards`, `values` and `dones` must have equal length.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    tail_value: f32,
    gamma: f32,
    lam: f32,
) -> (Vec<f32>, Vec<f32>) {
    let len = rewards.len();
    assert!(
        values.len() == len && dones.len() == len,
        "segment arrays differ in length: rewards {}, values {}, dones {}",
        len,
        values.len(),
        dones.len()
    );

    let mut advantages = vec![0.0f32; len];
    let mut carry = 0.0f32;
    let mut successor = tail_value;

    let steps = rewards.iter().zip(values).zip(dones).enumerate().rev();
    for (t, ((&reward, &value), &done)) in steps {
        let keep = if done { 0.0 } else { gamma };
        let td_error = reward + keep * successor - value;
        carry = td_error + keep * lam * carry;
        advantages[t] = carry;
        successor = value;
    }

    let returns = advantages.iter().zip(values).map(|(a, v)| a + v).collect();
    (advantages, returns)
}

/// Shift and scale in place to mean 0 and standard deviation 1.
///
/// Nothing happens to an empty slice; a lone value is set to zero.
pub fn standardize(advantages: &mut [f32]) {
    match advantages.len() {
        0 => {}
        1 => advantages[0] = 0.0,
        len => {
            let count = len as f32;
            let mean = advantages.iter().sum::<f32>() / count;
            let var = advantages.iter().map(|a| (a - mean) * (a - mean)).sum::<f32>() / count;
            let scale = 1.0 / (var + 1e-8).sqrt();
            advantages.iter_mut().for_each(|a| *a = (*a - mean) * scale);
        }
    }
}
