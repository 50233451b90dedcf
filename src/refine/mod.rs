//! Sub-sample peak refinement by quadratic fits.

pub(crate) mod quad1d;
pub(crate) mod quad2d;
