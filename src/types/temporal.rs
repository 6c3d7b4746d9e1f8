//! Time and timestamp types
//!
//! Every family is parametric over a fractional-second precision in
//! `0..=12`. Low precisions pack a value into one `i64` ("short"); higher
//! ones need a 12-byte entry of a long plus an int ("long"):
//!
//! | family                     | short up to | short value                    |
//! |----------------------------|-------------|--------------------------------|
//! | `time`                     | 12          | picoseconds of day             |
//! | `time with time zone`      | 9           | `nanos << 11 \| offset + 840`  |
//! | `timestamp`                | 6           | epoch microseconds             |
//! | `timestamp with time zone` | 3           | `epoch millis << 12 \| zone`   |

use crate::block::{Block, BlockBuilder, BlockBuilderStatus};
use crate::common::constants::{MAX_TEMPORAL_PRECISION, SIZE_OF_INT, SIZE_OF_LONG};
use crate::common::error::PrismResult;
use crate::common::helper::hash_long;
use crate::invalid_arg_err;
use crate::types::logical_type::{
    delegate_base_type, fixed_width_block_builder, unexpected_object, unsupported, BaseType,
    ComparableType, FixedWidthType, NativeKind, ObjectValue, OrderableType, Type, TypeRef,
};
use crate::types::scalar::{comparable_by, fixed_width_capabilities};
use crate::types::signature::{TypeSignature, TypeSignatureParameter};
use std::cmp::Ordering;
use std::sync::Arc;

pub const TIME: &str = "time";
pub const TIME_WITH_TIME_ZONE: &str = "time with time zone";
pub const TIMESTAMP: &str = "timestamp";
pub const TIMESTAMP_WITH_TIME_ZONE: &str = "timestamp with time zone";

pub const MAX_SHORT_TIME_WITH_TIME_ZONE_PRECISION: u32 = 9;
pub const MAX_SHORT_TIMESTAMP_PRECISION: u32 = 6;
pub const MAX_SHORT_TIMESTAMP_WITH_TIME_ZONE_PRECISION: u32 = 3;

/// Entry size of the long representations
pub const LONG_TEMPORAL_SIZE: usize = SIZE_OF_LONG + SIZE_OF_INT;

const TIME_ZONE_MASK: i64 = 0xFFF;
const OFFSET_MASK: i64 = 0x7FF;
const OFFSET_BIAS: i32 = 840;
const NANOSECONDS_PER_MINUTE: i64 = 60_000_000_000;
const PICOSECONDS_PER_MINUTE: i64 = 60_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LongTimestamp {
    pub epoch_micros: i64,
    pub picos_of_micro: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongTimestampWithTimeZone {
    pub epoch_millis: i64,
    pub picos_of_milli: i32,
    pub time_zone_key: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongTimeWithTimeZone {
    pub picoseconds: i64,
    pub offset_minutes: i32,
}

pub fn pack_date_time_with_zone(epoch_millis: i64, time_zone_key: i16) -> i64 {
    (epoch_millis << 12) | (time_zone_key as i64 & TIME_ZONE_MASK)
}

pub fn unpack_millis_utc(packed: i64) -> i64 {
    packed >> 12
}

pub fn unpack_zone_key(packed: i64) -> i16 {
    (packed & TIME_ZONE_MASK) as i16
}

pub fn pack_time_with_time_zone(nanos: i64, offset_minutes: i32) -> i64 {
    (nanos << 11) | ((offset_minutes + OFFSET_BIAS) as i64 & OFFSET_MASK)
}

pub fn unpack_time_nanos(packed: i64) -> i64 {
    packed >> 11
}

pub fn unpack_offset_minutes(packed: i64) -> i32 {
    (packed & OFFSET_MASK) as i32 - OFFSET_BIAS
}

fn check_precision(family: &str, precision: u32) -> PrismResult<()> {
    if precision > MAX_TEMPORAL_PRECISION {
        return Err(invalid_arg_err!(
            "{} precision must be in range [0, {}]: {}",
            family,
            MAX_TEMPORAL_PRECISION,
            precision
        ));
    }
    Ok(())
}

fn precision_signature(base: &str, precision: u32) -> TypeSignature {
    TypeSignature::new(base, vec![TypeSignatureParameter::Long(precision as i64)])
}

fn read_fixed12(block: &dyn Block, position: usize) -> PrismResult<(i64, i32)> {
    Ok((block.get_long(position, 0)?, block.get_int(position, SIZE_OF_LONG)?))
}

fn write_fixed12(builder: &mut dyn BlockBuilder, high: i64, low: i32) -> PrismResult<()> {
    builder.write_long(high)?;
    builder.write_int(low)?;
    builder.close_entry()
}

fn hash_key(key: (i64, i64)) -> u64 {
    hash_long(key.0).wrapping_mul(31).wrapping_add(hash_long(key.1))
}

/// Equality, hashing and order through a normalized `(i64, i64)` key
macro_rules! compared_by_key {
    ($ty:ty) => {
        impl ComparableType for $ty {
            fn equal_to(
                &self,
                left: &dyn Block,
                left_position: usize,
                right: &dyn Block,
                right_position: usize,
            ) -> PrismResult<bool> {
                Ok(self.comparison_key(left, left_position)?
                    == self.comparison_key(right, right_position)?)
            }

            fn hash(&self, block: &dyn Block, position: usize) -> PrismResult<u64> {
                Ok(hash_key(self.comparison_key(block, position)?))
            }
        }

        impl OrderableType for $ty {
            fn compare_to(
                &self,
                left: &dyn Block,
                left_position: usize,
                right: &dyn Block,
                right_position: usize,
            ) -> PrismResult<Ordering> {
                Ok(self
                    .comparison_key(left, left_position)?
                    .cmp(&self.comparison_key(right, right_position)?))
            }
        }

        impl FixedWidthType for $ty {
            fn fixed_size(&self) -> usize {
                if self.is_short() {
                    SIZE_OF_LONG
                } else {
                    LONG_TEMPORAL_SIZE
                }
            }
        }
    };
}

/// Time of day in picoseconds
#[derive(Debug, Clone)]
pub struct TimeType {
    base: BaseType,
    precision: u32,
}

impl TimeType {
    pub fn new(precision: u32) -> PrismResult<Self> {
        check_precision(TIME, precision)?;
        Ok(Self::of(precision))
    }

    fn of(precision: u32) -> Self {
        Self {
            base: BaseType::new(precision_signature(TIME, precision), NativeKind::Int64),
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }
}

impl Type for TimeType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        block.get_long(position, 0)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        builder.write_long(value)?;
        builder.close_entry()
    }
}

impl FixedWidthType for TimeType {
    fn fixed_size(&self) -> usize {
        SIZE_OF_LONG
    }
}

comparable_by!(TimeType, get_long, hash_long, |left: i64, right: i64| left
    .cmp(&right));

/// Time of day with a UTC offset; compared by the UTC instant
#[derive(Debug, Clone)]
pub struct TimeWithTimeZoneType {
    base: BaseType,
    precision: u32,
}

impl TimeWithTimeZoneType {
    pub fn new(precision: u32) -> PrismResult<Self> {
        check_precision(TIME_WITH_TIME_ZONE, precision)?;
        Ok(Self::of(precision))
    }

    fn of(precision: u32) -> Self {
        let kind = if precision <= MAX_SHORT_TIME_WITH_TIME_ZONE_PRECISION {
            NativeKind::Int64
        } else {
            NativeKind::Object
        };
        Self {
            base: BaseType::new(precision_signature(TIME_WITH_TIME_ZONE, precision), kind)
                .with_display_name(format!("time({}) with time zone", precision)),
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn is_short(&self) -> bool {
        self.precision <= MAX_SHORT_TIME_WITH_TIME_ZONE_PRECISION
    }

    fn read_long_value(&self, block: &dyn Block, position: usize) -> PrismResult<LongTimeWithTimeZone> {
        let (picoseconds, offset_minutes) = read_fixed12(block, position)?;
        Ok(LongTimeWithTimeZone {
            picoseconds,
            offset_minutes,
        })
    }

    fn comparison_key(&self, block: &dyn Block, position: usize) -> PrismResult<(i64, i64)> {
        if self.is_short() {
            let packed = block.get_long(position, 0)?;
            let normalized = unpack_time_nanos(packed)
                - unpack_offset_minutes(packed) as i64 * NANOSECONDS_PER_MINUTE;
            return Ok((normalized, 0));
        }
        let value = self.read_long_value(block, position)?;
        Ok((
            value.picoseconds - value.offset_minutes as i64 * PICOSECONDS_PER_MINUTE,
            0,
        ))
    }
}

impl Type for TimeWithTimeZoneType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        if !self.is_short() {
            return Err(unsupported(self, "get_long"));
        }
        block.get_long(position, 0)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        if !self.is_short() {
            return Err(unsupported(self, "write_long"));
        }
        builder.write_long(value)?;
        builder.close_entry()
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        if self.is_short() {
            return Err(unsupported(self, "get_object"));
        }
        Ok(ObjectValue::LongTimeWithTimeZone(
            self.read_long_value(block, position)?,
        ))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        match value {
            ObjectValue::LongTimeWithTimeZone(value) if !self.is_short() => {
                write_fixed12(builder, value.picoseconds, value.offset_minutes)
            }
            _ => Err(unexpected_object(self, value)),
        }
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        if self.is_short() {
            let packed = block.get_long(position, 0)?;
            return Ok(format!(
                "{}ns{:+}min",
                unpack_time_nanos(packed),
                unpack_offset_minutes(packed)
            ));
        }
        let value = self.read_long_value(block, position)?;
        Ok(format!("{}ps{:+}min", value.picoseconds, value.offset_minutes))
    }
}

compared_by_key!(TimeWithTimeZoneType);

/// Timestamp without zone: epoch microseconds, plus picoseconds when long
#[derive(Debug, Clone)]
pub struct TimestampType {
    base: BaseType,
    precision: u32,
}

impl TimestampType {
    pub fn new(precision: u32) -> PrismResult<Self> {
        check_precision(TIMESTAMP, precision)?;
        Ok(Self::of(precision))
    }

    fn of(precision: u32) -> Self {
        let kind = if precision <= MAX_SHORT_TIMESTAMP_PRECISION {
            NativeKind::Int64
        } else {
            NativeKind::Object
        };
        Self {
            base: BaseType::new(precision_signature(TIMESTAMP, precision), kind),
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn is_short(&self) -> bool {
        self.precision <= MAX_SHORT_TIMESTAMP_PRECISION
    }

    fn read_long_value(&self, block: &dyn Block, position: usize) -> PrismResult<LongTimestamp> {
        let (epoch_micros, picos_of_micro) = read_fixed12(block, position)?;
        Ok(LongTimestamp {
            epoch_micros,
            picos_of_micro,
        })
    }

    fn comparison_key(&self, block: &dyn Block, position: usize) -> PrismResult<(i64, i64)> {
        if self.is_short() {
            return Ok((block.get_long(position, 0)?, 0));
        }
        let value = self.read_long_value(block, position)?;
        Ok((value.epoch_micros, value.picos_of_micro as i64))
    }
}

impl Type for TimestampType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        if !self.is_short() {
            return Err(unsupported(self, "get_long"));
        }
        block.get_long(position, 0)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        if !self.is_short() {
            return Err(unsupported(self, "write_long"));
        }
        builder.write_long(value)?;
        builder.close_entry()
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        if self.is_short() {
            return Err(unsupported(self, "get_object"));
        }
        Ok(ObjectValue::LongTimestamp(self.read_long_value(block, position)?))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        match value {
            ObjectValue::LongTimestamp(value) if !self.is_short() => {
                write_fixed12(builder, value.epoch_micros, value.picos_of_micro)
            }
            _ => Err(unexpected_object(self, value)),
        }
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        if self.is_short() {
            return Ok(format!("{}us", block.get_long(position, 0)?));
        }
        let value = self.read_long_value(block, position)?;
        Ok(format!("{}us+{}ps", value.epoch_micros, value.picos_of_micro))
    }
}

compared_by_key!(TimestampType);

/// Instant with a time zone key; compared by the UTC instant only
#[derive(Debug, Clone)]
pub struct TimestampWithTimeZoneType {
    base: BaseType,
    precision: u32,
}

impl TimestampWithTimeZoneType {
    pub fn new(precision: u32) -> PrismResult<Self> {
        check_precision(TIMESTAMP_WITH_TIME_ZONE, precision)?;
        Ok(Self::of(precision))
    }

    fn of(precision: u32) -> Self {
        let kind = if precision <= MAX_SHORT_TIMESTAMP_WITH_TIME_ZONE_PRECISION {
            NativeKind::Int64
        } else {
            NativeKind::Object
        };
        Self {
            base: BaseType::new(precision_signature(TIMESTAMP_WITH_TIME_ZONE, precision), kind)
                .with_display_name(format!("timestamp({}) with time zone", precision)),
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn is_short(&self) -> bool {
        self.precision <= MAX_SHORT_TIMESTAMP_WITH_TIME_ZONE_PRECISION
    }

    fn read_long_value(
        &self,
        block: &dyn Block,
        position: usize,
    ) -> PrismResult<LongTimestampWithTimeZone> {
        let (packed, picos_of_milli) = read_fixed12(block, position)?;
        Ok(LongTimestampWithTimeZone {
            epoch_millis: unpack_millis_utc(packed),
            picos_of_milli,
            time_zone_key: unpack_zone_key(packed),
        })
    }

    fn comparison_key(&self, block: &dyn Block, position: usize) -> PrismResult<(i64, i64)> {
        if self.is_short() {
            return Ok((unpack_millis_utc(block.get_long(position, 0)?), 0));
        }
        let value = self.read_long_value(block, position)?;
        Ok((value.epoch_millis, value.picos_of_milli as i64))
    }
}

impl Type for TimestampWithTimeZoneType {
    delegate_base_type!();
    fixed_width_capabilities!();

    fn get_long(&self, block: &dyn Block, position: usize) -> PrismResult<i64> {
        if !self.is_short() {
            return Err(unsupported(self, "get_long"));
        }
        block.get_long(position, 0)
    }

    fn write_long(&self, builder: &mut dyn BlockBuilder, value: i64) -> PrismResult<()> {
        if !self.is_short() {
            return Err(unsupported(self, "write_long"));
        }
        builder.write_long(value)?;
        builder.close_entry()
    }

    fn get_object(&self, block: &dyn Block, position: usize) -> PrismResult<ObjectValue> {
        if self.is_short() {
            return Err(unsupported(self, "get_object"));
        }
        Ok(ObjectValue::LongTimestampWithTimeZone(
            self.read_long_value(block, position)?,
        ))
    }

    fn write_object(&self, builder: &mut dyn BlockBuilder, value: &ObjectValue) -> PrismResult<()> {
        match value {
            ObjectValue::LongTimestampWithTimeZone(value) if !self.is_short() => write_fixed12(
                builder,
                pack_date_time_with_zone(value.epoch_millis, value.time_zone_key),
                value.picos_of_milli,
            ),
            _ => Err(unexpected_object(self, value)),
        }
    }

    fn format_value(&self, block: &dyn Block, position: usize) -> PrismResult<String> {
        if block.is_null(position)? {
            return Ok("NULL".to_string());
        }
        if self.is_short() {
            let packed = block.get_long(position, 0)?;
            return Ok(format!(
                "{}ms@{}",
                unpack_millis_utc(packed),
                unpack_zone_key(packed)
            ));
        }
        let value = self.read_long_value(block, position)?;
        Ok(format!(
            "{}ms+{}ps@{}",
            value.epoch_millis, value.picos_of_milli, value.time_zone_key
        ))
    }
}

compared_by_key!(TimestampWithTimeZoneType);

/// Temporal types of every precision, built once and looked up by precision
#[derive(Debug, Clone)]
pub struct TemporalTypeTables {
    times: Vec<TypeRef>,
    times_with_time_zone: Vec<TypeRef>,
    timestamps: Vec<TypeRef>,
    timestamps_with_time_zone: Vec<TypeRef>,
}

impl TemporalTypeTables {
    pub fn new() -> Self {
        let precisions = 0..=MAX_TEMPORAL_PRECISION;
        Self {
            times: precisions
                .clone()
                .map(|p| Arc::new(TimeType::of(p)) as TypeRef)
                .collect(),
            times_with_time_zone: precisions
                .clone()
                .map(|p| Arc::new(TimeWithTimeZoneType::of(p)) as TypeRef)
                .collect(),
            timestamps: precisions
                .clone()
                .map(|p| Arc::new(TimestampType::of(p)) as TypeRef)
                .collect(),
            timestamps_with_time_zone: precisions
                .map(|p| Arc::new(TimestampWithTimeZoneType::of(p)) as TypeRef)
                .collect(),
        }
    }

    fn lookup(table: &[TypeRef], family: &str, precision: u32) -> PrismResult<TypeRef> {
        check_precision(family, precision)?;
        Ok(Arc::clone(&table[precision as usize]))
    }

    pub fn time(&self, precision: u32) -> PrismResult<TypeRef> {
        Self::lookup(&self.times, TIME, precision)
    }

    pub fn time_with_time_zone(&self, precision: u32) -> PrismResult<TypeRef> {
        Self::lookup(&self.times_with_time_zone, TIME_WITH_TIME_ZONE, precision)
    }

    pub fn timestamp(&self, precision: u32) -> PrismResult<TypeRef> {
        Self::lookup(&self.timestamps, TIMESTAMP, precision)
    }

    pub fn timestamp_with_time_zone(&self, precision: u32) -> PrismResult<TypeRef> {
        Self::lookup(
            &self.timestamps_with_time_zone,
            TIMESTAMP_WITH_TIME_ZONE,
            precision,
        )
    }
}

impl Default for TemporalTypeTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockRef;

    fn build(
        ty: &dyn Type,
        write: impl Fn(&mut dyn BlockBuilder) -> PrismResult<()>,
    ) -> PrismResult<BlockRef> {
        let mut builder = ty.create_block_builder(None, 2)?;
        write(builder.as_mut())?;
        builder.build()
    }

    #[test]
    fn test_tables_cover_every_precision() -> PrismResult<()> {
        let tables = TemporalTypeTables::new();
        for precision in 0..=MAX_TEMPORAL_PRECISION {
            assert_eq!(
                tables.timestamp(precision)?.signature(),
                &precision_signature(TIMESTAMP, precision)
            );
        }
        assert!(tables.time(13).is_err());
        assert!(TimestampType::new(13).is_err());
        assert_eq!(
            tables.timestamp_with_time_zone(3)?.display_name(),
            "timestamp(3) with time zone"
        );
        assert_eq!(tables.time_with_time_zone(9)?.native_kind(), NativeKind::Int64);
        assert_eq!(tables.time_with_time_zone(10)?.native_kind(), NativeKind::Object);
        assert_eq!(tables.timestamp(6)?.native_kind(), NativeKind::Int64);
        assert_eq!(tables.timestamp(7)?.native_kind(), NativeKind::Object);
        assert_eq!(tables.timestamp_with_time_zone(4)?.native_kind(), NativeKind::Object);
        Ok(())
    }

    #[test]
    fn test_long_timestamp_round_trip() -> PrismResult<()> {
        let timestamp = TimestampType::new(9)?;
        assert_eq!(timestamp.fixed_size(), LONG_TEMPORAL_SIZE);
        let value = LongTimestamp {
            epoch_micros: 1_600_000_000_000_000,
            picos_of_micro: 123_000,
        };
        let block = build(&timestamp, |b| {
            timestamp.write_object(b, &ObjectValue::LongTimestamp(value))
        })?;
        assert_eq!(block.size_in_bytes()?, LONG_TEMPORAL_SIZE + 1);
        match timestamp.get_object(block.as_ref(), 0)? {
            ObjectValue::LongTimestamp(read) => assert_eq!(read, value),
            other => panic!("unexpected {other:?}"),
        }
        assert!(timestamp.get_long(block.as_ref(), 0).is_err());

        let mut builder = timestamp.create_block_builder(None, 1)?;
        timestamp.append_to(block.as_ref(), 0, builder.as_mut())?;
        let copy = builder.build()?;
        assert!(timestamp.equal_to(block.as_ref(), 0, copy.as_ref(), 0)?);
        Ok(())
    }

    #[test]
    fn test_zoned_timestamps_compare_by_instant() -> PrismResult<()> {
        let short = TimestampWithTimeZoneType::new(3)?;
        let block = build(&short, |b| {
            short.write_long(b, pack_date_time_with_zone(1_000, 7))?;
            short.write_long(b, pack_date_time_with_zone(1_000, 9))?;
            short.write_long(b, pack_date_time_with_zone(2_000, 7))
        })?;
        let block = block.as_ref();
        assert!(short.equal_to(block, 0, block, 1)?);
        assert_eq!(short.hash(block, 0)?, short.hash(block, 1)?);
        assert_eq!(short.compare_to(block, 1, block, 2)?, Ordering::Less);
        assert_eq!(short.format_value(block, 1)?, "1000ms@9");

        let long = TimestampWithTimeZoneType::new(12)?;
        let value = LongTimestampWithTimeZone {
            epoch_millis: -5,
            picos_of_milli: 42,
            time_zone_key: 1,
        };
        let block = build(&long, |b| {
            long.write_object(b, &ObjectValue::LongTimestampWithTimeZone(value))
        })?;
        match long.get_object(block.as_ref(), 0)? {
            ObjectValue::LongTimestampWithTimeZone(read) => assert_eq!(read, value),
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_time_with_time_zone_normalizes_offset() -> PrismResult<()> {
        let ty = TimeWithTimeZoneType::new(9)?;
        let hour = 60 * NANOSECONDS_PER_MINUTE;
        // 10:00+01:00 and 09:00+00:00 are the same instant
        let block = build(&ty, |b| {
            ty.write_long(b, pack_time_with_time_zone(10 * hour, 60))?;
            ty.write_long(b, pack_time_with_time_zone(9 * hour, 0))
        })?;
        assert!(ty.equal_to(block.as_ref(), 0, block.as_ref(), 1)?);
        assert_eq!(unpack_offset_minutes(pack_time_with_time_zone(0, -840)), -840);
        assert_eq!(unpack_time_nanos(pack_time_with_time_zone(hour, 5)), hour);
        Ok(())
    }

    #[test]
    fn test_wrong_object_rejected() -> PrismResult<()> {
        let timestamp = TimestampType::new(12)?;
        let mut builder = timestamp.create_block_builder(None, 1)?;
        let wrong = ObjectValue::LongTimeWithTimeZone(LongTimeWithTimeZone {
            picoseconds: 0,
            offset_minutes: 0,
        });
        assert!(timestamp.write_object(builder.as_mut(), &wrong).is_err());
        assert!(TimestampType::new(3)?
            .write_object(builder.as_mut(), &ObjectValue::LongTimestamp(LongTimestamp {
                epoch_micros: 0,
                picos_of_micro: 0,
            }))
            .is_err());
        Ok(())
    }
}
