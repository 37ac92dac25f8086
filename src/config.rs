//! Engine configuration, replacing the teacher's hardcoded constants
//! (`MAX_FRAMES_IN_FLIGHT`, `VALIDATION_ENABLED`) with fields an embedder
//! can override, defaulting to the teacher's own values.

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub validation_enabled: bool,
    pub max_frames_in_flight: usize,
    pub fifo_initial_capacity: usize,
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_title: "vkl".into(),
            window_width: 1024,
            window_height: 768,
            validation_enabled: cfg!(debug_assertions),
            max_frames_in_flight: 3,
            fifo_initial_capacity: 64,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_teacher_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_frames_in_flight, 3);
        assert_eq!(cfg.validation_enabled, cfg!(debug_assertions));
    }
}
