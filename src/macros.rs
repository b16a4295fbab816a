macro_rules! try_vec {
	($elem:expr; $size:expr) => {{ $crate::util::alloc::fallible_vec_from_element($elem, $size)? }};
}

// Shorthand for return Err(PtError::new(ErrorKind::Foo))
//
// Usage:
// - err!(Variant)          -> return Err(PtError::new(ErrorKind::Variant))
// - err!(Variant(value))   -> return Err(PtError::new(ErrorKind::Variant(value)))
macro_rules! err {
	($variant:ident) => {
		return Err(crate::error::PtError::new(
			crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($reason:expr)) => {
		return Err(crate::error::PtError::new(
			crate::error::ErrorKind::$variant($reason),
		))
	};
}

// Shorthand for ParseError::new(ParseStage::Foo, "Message")
//
// Usage:
//
// - parse_err!(Stage, Message)
//
// or bail:
//
// - parse_err!(@BAIL Stage, Message)
macro_rules! parse_err {
	($stage:ident, $reason:literal) => {
		Into::<crate::error::PtError>::into(crate::error::ParseError::new(
			crate::error::ParseStage::$stage,
			$reason,
		))
	};
	(@BAIL $stage:ident, $reason:literal) => {
		return Err(parse_err!($stage, $reason))
	};
}

pub(crate) use {err, parse_err, try_vec};
