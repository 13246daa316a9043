/// Completion bonus for time left on the clock.
///
/// `max(0, round((time_limit - elapsed) * bonus_rate))`.
pub fn time_bonus(time_limit: f32, elapsed: f32, bonus_rate: f32) -> u32 {
    let raw = ((time_limit - elapsed) * bonus_rate).round();
    if raw.is_finite() && raw > 0.0 {
        raw as u32
    } else {
        0
    }
}
