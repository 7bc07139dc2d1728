#[cfg(feature = "bbi")]
#[doc(inline)]
pub use gtars_bbi as bbi;
