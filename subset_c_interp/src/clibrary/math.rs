//! math.h: double-precision functions and the M_* constants.

use crate::error::CResult;
use crate::interp::{Interp, ParseState};
use crate::types::BaseType;
use crate::value::Value;

macro_rules! math_fn1 {
    ($name:ident, $func:expr) => {
        fn $name(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
            let x = interp.coerce_fp(ps, &args[0])?;
            interp.write_fp_as(ps, ret.addr, BaseType::Double, $func(x))
        }
    };
}

macro_rules! math_fn2 {
    ($name:ident, $func:expr) => {
        fn $name(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
            let x = interp.coerce_fp(ps, &args[0])?;
            let y = interp.coerce_fp(ps, &args[1])?;
            interp.write_fp_as(ps, ret.addr, BaseType::Double, $func(x, y))
        }
    };
}

math_fn1!(c_sin, f64::sin);
math_fn1!(c_cos, f64::cos);
math_fn1!(c_tan, f64::tan);
math_fn1!(c_asin, f64::asin);
math_fn1!(c_acos, f64::acos);
math_fn1!(c_atan, f64::atan);
math_fn1!(c_sinh, f64::sinh);
math_fn1!(c_cosh, f64::cosh);
math_fn1!(c_tanh, f64::tanh);
math_fn1!(c_exp, f64::exp);
math_fn1!(c_log, f64::ln);
math_fn1!(c_log10, f64::log10);
math_fn1!(c_sqrt, f64::sqrt);
math_fn1!(c_fabs, f64::abs);
math_fn1!(c_floor, f64::floor);
math_fn1!(c_ceil, f64::ceil);
math_fn1!(c_round, f64::round);
math_fn2!(c_atan2, f64::atan2);
math_fn2!(c_pow, f64::powf);
math_fn2!(c_fmod, |x: f64, y: f64| x % y);

pub fn register(interp: &mut Interp) -> CResult<()> {
    interp.library_add(&[
        (c_sin, "double sin(double);"),
        (c_cos, "double cos(double);"),
        (c_tan, "double tan(double);"),
        (c_asin, "double asin(double);"),
        (c_acos, "double acos(double);"),
        (c_atan, "double atan(double);"),
        (c_atan2, "double atan2(double, double);"),
        (c_sinh, "double sinh(double);"),
        (c_cosh, "double cosh(double);"),
        (c_tanh, "double tanh(double);"),
        (c_exp, "double exp(double);"),
        (c_log, "double log(double);"),
        (c_log10, "double log10(double);"),
        (c_pow, "double pow(double, double);"),
        (c_sqrt, "double sqrt(double);"),
        (c_fabs, "double fabs(double);"),
        (c_fmod, "double fmod(double, double);"),
        (c_floor, "double floor(double);"),
        (c_ceil, "double ceil(double);"),
        (c_round, "double round(double);"),
    ])?;

    let stream = interp.ensure_platform_stream()?;
    let ps = ParseState::new(stream);
    interp.define_platform_double(&ps, "M_E", std::f64::consts::E)?;
    interp.define_platform_double(&ps, "M_LOG2E", std::f64::consts::LOG2_E)?;
    interp.define_platform_double(&ps, "M_LOG10E", std::f64::consts::LOG10_E)?;
    interp.define_platform_double(&ps, "M_LN2", std::f64::consts::LN_2)?;
    interp.define_platform_double(&ps, "M_LN10", std::f64::consts::LN_10)?;
    interp.define_platform_double(&ps, "M_PI", std::f64::consts::PI)?;
    interp.define_platform_double(&ps, "M_PI_2", std::f64::consts::FRAC_PI_2)?;
    interp.define_platform_double(&ps, "M_PI_4", std::f64::consts::FRAC_PI_4)?;
    interp.define_platform_double(&ps, "M_1_PI", std::f64::consts::FRAC_1_PI)?;
    interp.define_platform_double(&ps, "M_2_PI", std::f64::consts::FRAC_2_PI)?;
    interp.define_platform_double(&ps, "M_2_SQRTPI", std::f64::consts::FRAC_2_SQRT_PI)?;
    interp.define_platform_double(&ps, "M_SQRT2", std::f64::consts::SQRT_2)?;
    interp.define_platform_double(&ps, "M_SQRT1_2", std::f64::consts::FRAC_1_SQRT_2)?;
    Ok(())
}
