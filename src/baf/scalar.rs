use crate::baf::error::ErrorKind;

/// Byte order applied to every scalar encoding in a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
	#[default]
	Little,
	Big,
}

/// Fixed-width two's-complement integer codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
	U8,
	S8,
	U16,
	S16,
	U32,
	S32,
	U64,
	S64,
}

impl ScalarKind {
	pub fn name(self) -> &'static str {
		match self {
			ScalarKind::U8 => "U8",
			ScalarKind::S8 => "S8",
			ScalarKind::U16 => "U16",
			ScalarKind::S16 => "S16",
			ScalarKind::U32 => "U32",
			ScalarKind::S32 => "S32",
			ScalarKind::U64 => "U64",
			ScalarKind::S64 => "S64",
		}
	}

	/// Encoded width in bytes.
	pub fn width(self) -> usize {
		match self {
			ScalarKind::U8 | ScalarKind::S8 => 1,
			ScalarKind::U16 | ScalarKind::S16 => 2,
			ScalarKind::U32 | ScalarKind::S32 => 4,
			ScalarKind::U64 | ScalarKind::S64 => 8,
		}
	}

	pub fn signed(self) -> bool {
		matches!(self, ScalarKind::S8 | ScalarKind::S16 | ScalarKind::S32 | ScalarKind::S64)
	}

	/// Inclusive accepted range.
	pub fn bounds(self) -> (i128, i128) {
		let bits = (self.width() * 8) as u32;
		if self.signed() {
			(-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
		} else {
			(0, (1_i128 << bits) - 1)
		}
	}

	/// Encode one value, rejecting anything outside the codec range.
	pub fn encode(self, value: i128, order: ByteOrder) -> Result<Vec<u8>, ErrorKind> {
		let (min, max) = self.bounds();
		if value < min || value > max {
			return Err(ErrorKind::OutOfRange {
				value,
				codec: self.name(),
				min,
				max,
			});
		}

		// In-range values truncate to the correct two's-complement form.
		let width = self.width();
		let bytes = match order {
			ByteOrder::Little => value.to_le_bytes()[..width].to_vec(),
			ByteOrder::Big => value.to_be_bytes()[16 - width..].to_vec(),
		};
		Ok(bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::{ByteOrder, ScalarKind};
	use crate::baf::error::ErrorKind;

	#[test]
	fn unsigned_little_endian_encoding() {
		let bytes = ScalarKind::U16.encode(0x0190, ByteOrder::Little).expect("in range");
		assert_eq!(bytes, [0x90, 0x01]);

		let bytes = ScalarKind::U32.encode(1, ByteOrder::Little).expect("in range");
		assert_eq!(bytes, [1, 0, 0, 0]);
	}

	#[test]
	fn big_endian_encoding() {
		let bytes = ScalarKind::U16.encode(0x0190, ByteOrder::Big).expect("in range");
		assert_eq!(bytes, [0x01, 0x90]);
	}

	#[test]
	fn signed_values_use_twos_complement() {
		let bytes = ScalarKind::S8.encode(-1, ByteOrder::Little).expect("in range");
		assert_eq!(bytes, [0xff]);

		let bytes = ScalarKind::S16.encode(-2, ByteOrder::Little).expect("in range");
		assert_eq!(bytes, [0xfe, 0xff]);

		let bytes = ScalarKind::S32.encode(-1, ByteOrder::Big).expect("in range");
		assert_eq!(bytes, [0xff, 0xff, 0xff, 0xff]);
	}

	#[test]
	fn range_bounds_are_inclusive() {
		assert!(ScalarKind::U8.encode(255, ByteOrder::Little).is_ok());
		assert!(ScalarKind::S8.encode(-128, ByteOrder::Little).is_ok());
		assert!(ScalarKind::S8.encode(127, ByteOrder::Little).is_ok());
		assert!(ScalarKind::U64.encode(u64::MAX as i128, ByteOrder::Little).is_ok());
	}

	#[test]
	fn out_of_range_is_rejected_with_bounds() {
		let err = ScalarKind::U8.encode(256, ByteOrder::Little).expect_err("out of range");
		match err {
			ErrorKind::OutOfRange { value, codec, min, max } => {
				assert_eq!(value, 256);
				assert_eq!(codec, "U8");
				assert_eq!(min, 0);
				assert_eq!(max, 255);
			}
			other => panic!("unexpected error: {other:?}"),
		}

		assert!(ScalarKind::U8.encode(-1, ByteOrder::Little).is_err());
		assert!(ScalarKind::S16.encode(32768, ByteOrder::Little).is_err());
	}
}
