//! Vehicle metadata entered alongside the flight log

/// Frame types offered by the form. Other values are accepted verbatim.
pub const FRAME_TYPES: &[&str] = &["Quadcopter", "Hexacopter", "Octocopter", "Fixed Wing", "VTOL"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareField {
    FrameType,
    Weight,
    BatteryCells,
    BatteryCapacity,
    MotorKv,
    PropellerSize,
    EscCurrent,
}

impl HardwareField {
    pub const ALL: [HardwareField; 7] = [
        HardwareField::FrameType,
        HardwareField::Weight,
        HardwareField::BatteryCells,
        HardwareField::BatteryCapacity,
        HardwareField::MotorKv,
        HardwareField::PropellerSize,
        HardwareField::EscCurrent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HardwareField::FrameType => "Frame Type",
            HardwareField::Weight => "Weight (kg)",
            HardwareField::BatteryCells => "Battery Cells (S)",
            HardwareField::BatteryCapacity => "Battery Capacity (mAh)",
            HardwareField::MotorKv => "Motor KV",
            HardwareField::PropellerSize => "Propeller Size (in)",
            HardwareField::EscCurrent => "ESC Rating (A)",
        }
    }
}

/// Free-text-backed hardware description. Values are kept exactly as typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareContext {
    pub frame_type: String,
    pub weight_kg: String,
    pub battery_cells: String,
    pub battery_capacity_mah: String,
    pub motor_kv: String,
    pub prop_size_in: String,
    pub esc_current_a: String,
}

impl Default for HardwareContext {
    fn default() -> Self {
        Self {
            frame_type: "Quadcopter".to_string(),
            weight_kg: "1.2".to_string(),
            battery_cells: "4".to_string(),
            battery_capacity_mah: "1500".to_string(),
            motor_kv: "2400".to_string(),
            prop_size_in: "5".to_string(),
            esc_current_a: "45".to_string(),
        }
    }
}

impl HardwareContext {
    pub fn field(&self, field: HardwareField) -> &str {
        match field {
            HardwareField::FrameType => &self.frame_type,
            HardwareField::Weight => &self.weight_kg,
            HardwareField::BatteryCells => &self.battery_cells,
            HardwareField::BatteryCapacity => &self.battery_capacity_mah,
            HardwareField::MotorKv => &self.motor_kv,
            HardwareField::PropellerSize => &self.prop_size_in,
            HardwareField::EscCurrent => &self.esc_current_a,
        }
    }

    pub fn set_field(&mut self, field: HardwareField, value: impl Into<String>) {
        let slot = match field {
            HardwareField::FrameType => &mut self.frame_type,
            HardwareField::Weight => &mut self.weight_kg,
            HardwareField::BatteryCells => &mut self.battery_cells,
            HardwareField::BatteryCapacity => &mut self.battery_capacity_mah,
            HardwareField::MotorKv => &mut self.motor_kv,
            HardwareField::PropellerSize => &mut self.prop_size_in,
            HardwareField::EscCurrent => &mut self.esc_current_a,
        };
        *slot = value.into();
    }

    pub fn has_known_frame_type(&self) -> bool {
        FRAME_TYPES.contains(&self.frame_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_field_touches_only_that_field() {
        let mut hw = HardwareContext::default();
        hw.set_field(HardwareField::MotorKv, "1750");

        assert_eq!(hw.field(HardwareField::MotorKv), "1750");
        let defaults = HardwareContext::default();
        for field in HardwareField::ALL.iter().filter(|f| **f != HardwareField::MotorKv) {
            assert_eq!(hw.field(*field), defaults.field(*field));
        }
    }

    #[test]
    fn test_free_text_frame_type() {
        let mut hw = HardwareContext::default();
        assert!(hw.has_known_frame_type());

        hw.set_field(HardwareField::FrameType, "Tricopter");
        assert_eq!(hw.frame_type, "Tricopter");
        assert!(!hw.has_known_frame_type());
    }
}
