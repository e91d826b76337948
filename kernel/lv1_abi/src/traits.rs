use crate::errors::Lv1Error;
use core::fmt::Debug;

/// A trait for binding a hypervisor call number to its specific argument and return type.
pub trait HvcallBinding {
    /// The hypervisor call number which identifies this call.
    const HVCALL_NO: u64;

    /// The type that is used to encode the call arguments.
    ///
    /// It must be representable as `RawHvcallArgs` since that is what is written to the CPUs registers when the
    /// call is executed.
    /// Hypervisor emulations need to reconstruct the arguments from the registers, so a backwards conversion must
    /// also be possible.
    type CallArgs: TryFrom<RawHvcallArgs> + Into<RawHvcallArgs> + Debug;

    /// The type that is used to encode the call result.
    type Return: FromRawHvResponse + IntoRawHvResponse + Debug;
}

/// The arguments to a hypervisor call as they are encoded in the registers `r3-r10`.
pub type RawHvcallArgs = [u64; 8];

/// The result of a hypervisor call as it is encoded in the registers `r3-r10`.
///
/// The first value is the status, the others are call specific outputs.
pub type RawHvcallReturn = [u64; 8];

/// The output values of a successful hypervisor call
pub type HvcallReturnData = [u64; 7];

/// Something that is able to execute hypervisor calls
pub trait Lv1 {
    /// Execute the hypervisor call with number `hvcall_no` and return the raw register contents afterwards
    fn raw_hvcall(&self, hvcall_no: u64, args: RawHvcallArgs) -> RawHvcallReturn;
}

/// A type that is used when a hypervisor call returns nothing besides its status.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NoValue;

impl From<HvcallReturnData> for NoValue {
    fn from(_value: HvcallReturnData) -> Self {
        NoValue
    }
}

impl From<NoValue> for HvcallReturnData {
    fn from(_value: NoValue) -> Self {
        [0; 7]
    }
}

pub trait FromRawHvResponse {
    fn from_response(raw: RawHvcallReturn) -> Self;
}

pub trait IntoRawHvResponse {
    fn into_response(self) -> RawHvcallReturn;
}

pub type Lv1Result<T> = Result<T, Lv1Error>;

impl<T> IntoRawHvResponse for Lv1Result<T>
where
    T: Into<HvcallReturnData>,
{
    fn into_response(self) -> RawHvcallReturn {
        match self {
            Ok(v) => {
                let out = v.into();
                [0, out[0], out[1], out[2], out[3], out[4], out[5], out[6]]
            }
            Err(e) => [e.status() as u64, 0, 0, 0, 0, 0, 0, 0],
        }
    }
}

impl<T> FromRawHvResponse for Lv1Result<T>
where
    T: TryFrom<HvcallReturnData>,
{
    fn from_response(raw: RawHvcallReturn) -> Self {
        match raw {
            [0, o1, o2, o3, o4, o5, o6, o7] => match T::try_from([o1, o2, o3, o4, o5, o6, o7]) {
                Ok(v) => Ok(v),
                Err(_) => Err(Lv1Error::ValueInvalid),
            },
            [status, ..] => Err(Lv1Error::from_status(status as i64)),
        }
    }
}
