use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// Relative tolerance used by the approximate comparisons.
pub const EPSILON: f32 = 1e-5;
/// Maximum distance in units-in-the-last-place still considered equal.
pub const MAX_ULPS: u32 = 4;

// ================================================================================================
// SCALAR HELPERS
// ================================================================================================

/// ULP/epsilon aware float comparison. NaN never compares equal.
pub fn approx_eq(a: f32, b: f32) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs()).max(1.0);
    if diff <= EPSILON * scale {
        return true;
    }
    if a.is_sign_positive() != b.is_sign_positive() {
        return false;
    }
    a.to_bits().abs_diff(b.to_bits()) <= MAX_ULPS
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

// ================================================================================================
// VECTORS
// ================================================================================================

macro_rules! impl_vector {
    ($name:ident, $n:literal, $($field:ident),+) => {
        impl $name {
            pub const fn new($($field: f32),+) -> Self {
                Self { $($field),+ }
            }

            pub const fn zero() -> Self {
                Self { $($field: 0.0),+ }
            }

            pub fn splat(v: f32) -> Self {
                Self { $($field: v),+ }
            }

            pub fn dot(&self, other: &Self) -> f32 {
                0.0 $(+ self.$field * other.$field)+
            }

            pub fn squared_length(&self) -> f32 {
                self.dot(self)
            }

            pub fn length(&self) -> f32 {
                self.squared_length().sqrt()
            }

            /// Normalizes in place. A zero-length vector becomes all NaN.
            pub fn normalize(&mut self) -> &mut Self {
                let len = self.length();
                if len == 0.0 {
                    *self = Self::splat(f32::NAN);
                } else {
                    $(self.$field /= len;)+
                }
                self
            }

            pub fn normalized(mut self) -> Self {
                self.normalize();
                self
            }

            pub fn has_nan(&self) -> bool {
                false $(|| self.$field.is_nan())+
            }

            pub fn min(&self, other: &Self) -> Self {
                Self { $($field: self.$field.min(other.$field)),+ }
            }

            pub fn max(&self, other: &Self) -> Self {
                Self { $($field: self.$field.max(other.$field)),+ }
            }

            pub fn to_array(self) -> [f32; $n] {
                [$(self.$field),+]
            }

            pub fn as_slice(&self) -> &[f32] {
                bytemuck::cast_slice(std::slice::from_ref(self))
            }
        }

        impl From<[f32; $n]> for $name {
            fn from(a: [f32; $n]) -> Self {
                let [$($field),+] = a;
                Self { $($field),+ }
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                true $(&& approx_eq(self.$field, other.$field))+
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self { $($field: self.$field - rhs.$field),+ }
            }
        }

        impl Mul<f32> for $name {
            type Output = Self;
            fn mul(self, rhs: f32) -> Self {
                Self { $($field: self.$field * rhs),+ }
            }
        }

        impl Mul<$name> for f32 {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                rhs * self
            }
        }

        /// Division by zero yields all NaN.
        impl Div<f32> for $name {
            type Output = Self;
            fn div(self, rhs: f32) -> Self {
                if rhs == 0.0 {
                    return Self::splat(f32::NAN);
                }
                Self { $($field: self.$field / rhs),+ }
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self { $($field: -self.$field),+ }
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                *self = *self - rhs;
            }
        }

        impl MulAssign<f32> for $name {
            fn mul_assign(&mut self, rhs: f32) {
                *self = *self * rhs;
            }
        }

        impl DivAssign<f32> for $name {
            fn div_assign(&mut self, rhs: f32) {
                *self = *self / rhs;
            }
        }

        impl Index<usize> for $name {
            type Output = f32;
            fn index(&self, i: usize) -> &f32 {
                &self.as_slice()[i]
            }
        }

        impl IndexMut<usize> for $name {
            fn index_mut(&mut self, i: usize) -> &mut f32 {
                &mut bytemuck::cast_slice_mut(std::slice::from_mut(self))[i]
            }
        }
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl_vector!(Vector2, 2, x, y);
impl_vector!(Vector3, 3, x, y, z);
impl_vector!(Vector4, 4, x, y, z, w);

impl Vector3 {
    pub const UNIT_X: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const UNIT_Y: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const UNIT_Z: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn extend(self, w: f32) -> Vector4 {
        Vector4::new(self.x, self.y, self.z, w)
    }
}

impl Vector4 {
    pub fn truncate(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

// ================================================================================================
// MATRICES (column-major, element (row, col) at col * N + row)
// ================================================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Matrix3 {
    pub m: [f32; 9],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Matrix4 {
    pub m: [f32; 16],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3 {
    pub const fn identity() -> Self {
        Self { m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] }
    }

    pub fn from_rows(r0: Vector3, r1: Vector3, r2: Vector3) -> Self {
        Self { m: [r0.x, r1.x, r2.x, r0.y, r1.y, r2.y, r0.z, r1.z, r2.z] }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[col * 3 + row]
    }

    pub fn set(&mut self, row: usize, col: usize, v: f32) {
        self.m[col * 3 + row] = v;
    }

    pub fn row(&self, row: usize) -> Vector3 {
        Vector3::new(self.get(row, 0), self.get(row, 1), self.get(row, 2))
    }

    pub fn transpose(&self) -> Self {
        let mut ret = *self;
        for row in 0..3 {
            for col in 0..3 {
                ret.set(col, row, self.get(row, col));
            }
        }
        ret
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.m
    }
}

impl Matrix4 {
    pub const fn identity() -> Self {
        Self {
            m: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[col * 4 + row]
    }

    pub fn set(&mut self, row: usize, col: usize, v: f32) {
        self.m[col * 4 + row] = v;
    }

    pub fn translation(t: Vector3) -> Self {
        let mut ret = Self::identity();
        ret.set(0, 3, t.x);
        ret.set(1, 3, t.y);
        ret.set(2, 3, t.z);
        ret
    }

    /// Embeds a 3x3 rotation/scale block.
    pub fn from_matrix3(r: &Matrix3) -> Self {
        let mut ret = Self::identity();
        for row in 0..3 {
            for col in 0..3 {
                ret.set(row, col, r.get(row, col));
            }
        }
        ret
    }

    /// Standard OpenGL perspective projection.
    pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y_radians * 0.5).tan();
        let range_inv = 1.0 / (near - far);
        let mut ret = Self { m: [0.0; 16] };
        ret.set(0, 0, f / aspect);
        ret.set(1, 1, f);
        ret.set(2, 2, (near + far) * range_inv);
        ret.set(2, 3, 2.0 * near * far * range_inv);
        ret.set(3, 2, -1.0);
        ret
    }

    pub fn transpose(&self) -> Self {
        let mut ret = *self;
        for row in 0..4 {
            for col in 0..4 {
                ret.set(col, row, self.get(row, col));
            }
        }
        ret
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.m
    }
}

impl PartialEq for Matrix3 {
    fn eq(&self, other: &Self) -> bool {
        self.m.iter().zip(other.m.iter()).all(|(a, b)| approx_eq(*a, *b))
    }
}

impl PartialEq for Matrix4 {
    fn eq(&self, other: &Self) -> bool {
        self.m.iter().zip(other.m.iter()).all(|(a, b)| approx_eq(*a, *b))
    }
}

impl Mul for Matrix3 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut ret = Self { m: [0.0; 9] };
        for row in 0..3 {
            for col in 0..3 {
                let v = (0..3).map(|k| self.get(row, k) * rhs.get(k, col)).sum();
                ret.set(row, col, v);
            }
        }
        ret
    }
}

impl Mul for Matrix4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut ret = Self { m: [0.0; 16] };
        for row in 0..4 {
            for col in 0..4 {
                let v = (0..4).map(|k| self.get(row, k) * rhs.get(k, col)).sum();
                ret.set(row, col, v);
            }
        }
        ret
    }
}

impl Mul<Vector3> for Matrix3 {
    type Output = Vector3;
    fn mul(self, v: Vector3) -> Vector3 {
        Vector3::new(self.row(0).dot(&v), self.row(1).dot(&v), self.row(2).dot(&v))
    }
}

impl Mul<Vector4> for Matrix4 {
    type Output = Vector4;
    fn mul(self, v: Vector4) -> Vector4 {
        let mut ret = Vector4::zero();
        for row in 0..4 {
            ret[row] = (0..4).map(|k| self.get(row, k) * v[k]).sum();
        }
        ret
    }
}

// ================================================================================================
// QUATERNION
// ================================================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Rotation of `angle` radians around `axis` (normalized here).
    pub fn from_axis_angle(axis: Vector3, angle: f32) -> Self {
        let a = axis.normalized();
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(a.x * s, a.y * s, a.z * s, c)
    }

    pub fn vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN);
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let u = self.vector();
        let t = u.cross(&v) * 2.0;
        v + t * self.w + u.cross(&t)
    }

    pub fn to_matrix3(&self) -> Matrix3 {
        let Self { x, y, z, w } = *self;
        Matrix3::from_rows(
            Vector3::new(1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w)),
            Vector3::new(2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w)),
            Vector3::new(2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y)),
        )
    }

    pub fn to_matrix4(&self) -> Matrix4 {
        Matrix4::from_matrix3(&self.to_matrix3())
    }
}

impl Mul for Quaternion {
    type Output = Self;
    fn mul(self, r: Self) -> Self {
        Self::new(
            self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
            self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
            self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w,
            self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
        )
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, o: &Self) -> bool {
        approx_eq(self.x, o.x) && approx_eq(self.y, o.y) && approx_eq(self.z, o.z) && approx_eq(self.w, o.w)
    }
}
