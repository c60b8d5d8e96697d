/// Tunable simulation parameters. The defaults mirror the shipped game; none
/// of these values are contracts, but the speed function must stay monotonic
/// in snake length.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    /// Board is `grid_size` x `grid_size` cells, toroidal.
    pub grid_size: u16,
    /// Tick interval for a length-1 snake, in milliseconds.
    pub base_tick_ms: u64,
    /// Floor for the tick interval.
    pub min_tick_ms: u64,
    /// Every `speedup_step` segments of growth shaves `speedup_decrement_ms`
    /// off the interval.
    pub speedup_step: usize,
    pub speedup_decrement_ms: u64,
    /// Probability that a freshly spawned food is special.
    pub special_food_chance: f64,
    /// Lifetime of special food, in milliseconds.
    pub special_food_ttl_ms: i64,
    pub regular_food_points: i64,
    pub special_food_points: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            base_tick_ms: 150,
            min_tick_ms: 70,
            speedup_step: 5,
            speedup_decrement_ms: 10,
            special_food_chance: 0.2,
            special_food_ttl_ms: 15_000,
            regular_food_points: 1,
            special_food_points: 5,
        }
    }
}
