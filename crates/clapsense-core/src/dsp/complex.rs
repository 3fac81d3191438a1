//! Complex number arithmetic and analytic functions
//!
//! [`Complex`] is a `Copy` value type over two `f64` components. Arithmetic
//! follows the textbook cartesian formulas with no special-casing, so a
//! division by zero modulus yields NaN/Inf exactly as IEEE754 dictates.
//!
//! The analytic functions are built from logarithmic and exponential
//! identities rather than delegating to a library, so the FFT twiddle
//! factors and spectral levels depend only on the formulas in this file.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Complex number with 64-bit floating point components
///
/// Equality is exact component-wise equality. Use [`Complex::approx_eq`]
/// when comparing results of floating point computation.
///
/// # Example
/// ```
/// use clapsense_core::Complex;
///
/// let z = Complex::new(3.0, 4.0);
/// assert_eq!(z.modulus(), 5.0);
/// assert_eq!(z.conjugate(), Complex::new(3.0, -4.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    /// Real component
    pub re: f64,
    /// Imaginary component
    pub im: f64,
}

/// Branch selector for the shared asin/acos formula
#[derive(Debug, Clone, Copy)]
enum CircularBranch {
    Sine,
    Cosine,
}

/// Branch selector for the shared asinh/acosh formula
#[derive(Debug, Clone, Copy)]
enum HyperbolicBranch {
    Sine,
    Cosine,
}

impl Complex {
    /// Zero
    pub const ZERO: Complex = Complex::new(0.0, 0.0);
    /// Multiplicative identity
    pub const ONE: Complex = Complex::new(1.0, 0.0);
    /// Imaginary unit
    pub const I: Complex = Complex::new(0.0, 1.0);

    /// Create a complex number from cartesian components
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Create a complex number from modulus and phase (radians)
    ///
    /// # Example
    /// ```
    /// use clapsense_core::Complex;
    ///
    /// let z = Complex::from_polar(2.0, std::f64::consts::FRAC_PI_2);
    /// assert!(z.approx_eq(Complex::new(0.0, 2.0), 1e-12));
    /// ```
    pub fn from_polar(modulus: f64, phase: f64) -> Self {
        Self {
            re: modulus * phase.cos(),
            im: modulus * phase.sin(),
        }
    }

    /// Real part
    pub fn real(self) -> f64 {
        self.re
    }

    /// Imaginary part
    pub fn imag(self) -> f64 {
        self.im
    }

    /// Distance from the origin, `hypot(re, im)`
    pub fn modulus(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Principal argument, `atan2(im, re)`
    pub fn phase(self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Mirror in the real axis
    pub fn conjugate(self) -> Self {
        Self::new(self.re, -self.im)
    }

    /// `1 / z`
    ///
    /// Returns NaN components when `z` has zero modulus.
    pub fn reciprocal(self) -> Self {
        let f = self.re * self.re + self.im * self.im;
        Self::new(self.re / f, -self.im / f)
    }

    /// Component-wise comparison within an absolute tolerance
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.re - other.re).abs() <= tolerance && (self.im - other.im).abs() <= tolerance
    }

    /// True if either component is NaN
    pub fn is_nan(self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    // ---- power functions ----

    /// Principal square root
    ///
    /// The imaginary part of the result carries the sign of `Im z`, with
    /// zero treated as non-negative.
    pub fn sqrt(self) -> Self {
        let m = self.modulus();
        let r = (0.5 * (m + self.re)).sqrt();
        let mut i = (0.5 * (m - self.re)).sqrt();
        if self.im < 0.0 {
            i = -i;
        }
        Self::new(r, i)
    }

    /// `e^z`
    pub fn exp(self) -> Self {
        let e = self.re.exp();
        Self::new(e * self.im.cos(), e * self.im.sin())
    }

    /// Natural logarithm on the principal branch
    ///
    /// The phase is folded by `-2π` when it exceeds `π`; values below `-π`
    /// are left untouched.
    pub fn ln(self) -> Self {
        let m = self.modulus();
        let mut p = self.phase();
        if p > PI {
            p -= 2.0 * PI;
        }
        Self::new(m.ln(), p)
    }

    /// `z^c` as `exp(c · ln z)`
    pub fn pow(self, c: Complex) -> Self {
        (c * self.ln()).exp()
    }

    /// Logarithm with a complex base, `ln z / ln base`
    pub fn log(self, base: Complex) -> Self {
        self.ln() / base.ln()
    }

    /// Base-10 logarithm
    pub fn log10(self) -> Self {
        self.log(Complex::from(10.0))
    }

    // ---- circular functions ----

    /// `sin(re)·cosh(im) + i·cos(re)·sinh(im)`
    ///
    /// # Example
    /// ```
    /// use clapsense_core::Complex;
    ///
    /// let z = Complex::new(0.5, 0.25);
    /// let one = z.sin() * z.sin() + z.cos() * z.cos();
    /// assert!(one.approx_eq(Complex::ONE, 1e-12));
    /// ```
    pub fn sin(self) -> Self {
        Self::new(
            self.re.sin() * self.im.cosh(),
            self.re.cos() * self.im.sinh(),
        )
    }

    /// `cos(re)·cosh(im) − i·sin(re)·sinh(im)`
    pub fn cos(self) -> Self {
        Self::new(
            self.re.cos() * self.im.cosh(),
            -self.re.sin() * self.im.sinh(),
        )
    }

    /// `sin z / cos z`
    pub fn tan(self) -> Self {
        self.sin() / self.cos()
    }

    /// `i · ln(√(1 − z²) − i·z)` for asin, `i · ln(z − i·√(1 − z²))` for acos
    fn inverse_circular(self, branch: CircularBranch) -> Self {
        let neg_i = Complex::new(0.0, -1.0);
        let root = (Complex::ONE - self * self).sqrt();
        let arg = match branch {
            CircularBranch::Sine => root + self * neg_i,
            CircularBranch::Cosine => self + root * neg_i,
        };
        arg.ln() * Complex::I
    }

    /// Inverse sine, `i · ln(√(1 − z²) − i·z)`
    pub fn asin(self) -> Self {
        self.inverse_circular(CircularBranch::Sine)
    }

    /// Inverse cosine, `i · ln(z − i·√(1 − z²))`
    pub fn acos(self) -> Self {
        self.inverse_circular(CircularBranch::Cosine)
    }

    /// `−i · ln((z − i) / (−z − i)) / 2`
    pub fn atan(self) -> Self {
        let ratio = Complex::new(self.re, self.im - 1.0) / Complex::new(-self.re, -self.im - 1.0);
        (Complex::new(0.0, -1.0) * ratio.ln()) / 2.0
    }

    /// `1 / sin z`
    pub fn csc(self) -> Self {
        Complex::ONE / self.sin()
    }

    /// `1 / cos z`
    pub fn sec(self) -> Self {
        Complex::ONE / self.cos()
    }

    /// `1 / tan z`
    pub fn cot(self) -> Self {
        Complex::ONE / self.tan()
    }

    /// `asin(1 / z)`
    pub fn acsc(self) -> Self {
        (Complex::ONE / self).asin()
    }

    /// `acos(1 / z)`
    pub fn asec(self) -> Self {
        (Complex::ONE / self).acos()
    }

    /// `atan(1 / z)`
    pub fn acot(self) -> Self {
        (Complex::ONE / self).atan()
    }

    // ---- hyperbolic functions ----

    /// `sinh(re)·cos(im) + i·cosh(re)·sin(im)`
    pub fn sinh(self) -> Self {
        Self::new(
            self.re.sinh() * self.im.cos(),
            self.re.cosh() * self.im.sin(),
        )
    }

    /// `cosh(re)·cos(im) + i·sinh(re)·sin(im)`
    pub fn cosh(self) -> Self {
        Self::new(
            self.re.cosh() * self.im.cos(),
            self.re.sinh() * self.im.sin(),
        )
    }

    /// `sinh z / cosh z`
    pub fn tanh(self) -> Self {
        self.sinh() / self.cosh()
    }

    /// `ln(z + √(z² ± 1))`, plus for asinh and minus for acosh
    fn inverse_hyperbolic(self, branch: HyperbolicBranch) -> Self {
        let mut c = self * self;
        match branch {
            HyperbolicBranch::Sine => c += 1.0,
            HyperbolicBranch::Cosine => c -= 1.0,
        }
        (self + c.sqrt()).ln()
    }

    /// Inverse hyperbolic sine, `ln(z + √(z² + 1))`
    pub fn asinh(self) -> Self {
        self.inverse_hyperbolic(HyperbolicBranch::Sine)
    }

    /// Inverse hyperbolic cosine, `ln(z + √(z² − 1))`
    pub fn acosh(self) -> Self {
        self.inverse_hyperbolic(HyperbolicBranch::Cosine)
    }

    /// `(ln(z + 1) − ln(−(z − 1))) / 2`
    pub fn atanh(self) -> Self {
        let c = (self + Complex::ONE).ln() - (-(self - Complex::ONE)).ln();
        c / 2.0
    }

    /// `1 / sinh z`
    pub fn csch(self) -> Self {
        Complex::ONE / self.sinh()
    }

    /// `1 / cosh z`
    pub fn sech(self) -> Self {
        Complex::ONE / self.cosh()
    }

    /// `1 / tanh z`
    pub fn coth(self) -> Self {
        Complex::ONE / self.tanh()
    }

    /// `asinh(1 / z)`
    pub fn acsch(self) -> Self {
        (Complex::ONE / self).asinh()
    }

    /// `acosh(1 / z)`
    pub fn asech(self) -> Self {
        (Complex::ONE / self).acosh()
    }

    /// `atanh(1 / z)`
    pub fn acoth(self) -> Self {
        (Complex::ONE / self).atanh()
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self::new(re, 0.0)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:+}i", self.re, self.im)
    }
}

impl Neg for Complex {
    type Output = Complex;

    fn neg(self) -> Complex {
        Complex::new(-self.re, -self.im)
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, c: Complex) -> Complex {
        Complex::new(self.re + c.re, self.im + c.im)
    }
}

impl Sub for Complex {
    type Output = Complex;

    fn sub(self, c: Complex) -> Complex {
        Complex::new(self.re - c.re, self.im - c.im)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, c: Complex) -> Complex {
        let r = self.re * c.re - self.im * c.im;
        let i = self.re * c.im + self.im * c.re;
        Complex::new(r, i)
    }
}

impl Div for Complex {
    type Output = Complex;

    fn div(self, c: Complex) -> Complex {
        let f = c.re * c.re + c.im * c.im;
        let r = self.re * c.re + self.im * c.im;
        let i = self.re * c.im - self.im * c.re;
        Complex::new(r / f, -i / f)
    }
}

// Scalars are lifted to `(x, 0)` and go through the complex formulas.
macro_rules! scalar_ops {
    ($($trait:ident $method:ident),*) => {
        $(
            impl $trait<f64> for Complex {
                type Output = Complex;

                fn $method(self, rhs: f64) -> Complex {
                    $trait::$method(self, Complex::from(rhs))
                }
            }
        )*
    };
}

scalar_ops!(Add add, Sub sub, Mul mul, Div div);

impl AddAssign for Complex {
    fn add_assign(&mut self, c: Complex) {
        *self = *self + c;
    }
}

impl SubAssign for Complex {
    fn sub_assign(&mut self, c: Complex) {
        *self = *self - c;
    }
}

impl MulAssign for Complex {
    fn mul_assign(&mut self, c: Complex) {
        *self = *self * c;
    }
}

impl DivAssign for Complex {
    fn div_assign(&mut self, c: Complex) {
        *self = *self / c;
    }
}

impl AddAssign<f64> for Complex {
    fn add_assign(&mut self, rhs: f64) {
        *self = *self + rhs;
    }
}

impl SubAssign<f64> for Complex {
    fn sub_assign(&mut self, rhs: f64) {
        *self = *self - rhs;
    }
}
