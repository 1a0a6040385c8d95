pub mod input_utils;
pub mod math;

pub use input_utils::{Key, KeyState, MouseButton};
pub use math::{Matrix3, Matrix4, Quaternion, Vector2, Vector3, Vector4};
