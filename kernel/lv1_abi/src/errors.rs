use thiserror_no_std::Error;

macro_rules! back_to_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $(#[$umeta:meta])* $uname:ident(i64),
        $($(#[$vmeta:meta])* $vname:ident = $val:expr,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $(#[$umeta])* $uname(i64),
            $($(#[$vmeta])* $vname,)*
        }

        impl $name {
            /// Decode a non-zero status returned in `r3`
            pub fn from_status(status: i64) -> Self {
                match status {
                    $(x if x == $val => $name::$vname,)*
                    other => {
                        log::warn!("hypervisor returned unknown status {other}");
                        $name::$uname(other)
                    }
                }
            }

            /// The raw status value as the hypervisor reports it
            pub fn status(self) -> i64 {
                match self {
                    $($name::$vname => $val,)*
                    $name::$uname(status) => status,
                }
            }
        }
    }
}

back_to_enum! {
    /// The non-success status codes returned by the hypervisor
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
    pub enum Lv1Error {
        #[error("the hypervisor returned unknown status {0}")]
        Unknown(i64),
        #[error("not enough resources to fulfill the request")]
        ResourceShortage = -2,
        #[error("the caller lacks the privilege for this call")]
        NoPrivilege = -3,
        #[error("the request was denied by hypervisor policy")]
        DeniedByPolicy = -4,
        #[error("access violation")]
        AccessViolation = -5,
        #[error("no such entry")]
        NoEntry = -6,
        #[error("duplicate entry")]
        DuplicateEntry = -7,
        #[error("type mismatch")]
        TypeMismatch = -8,
        #[error("the resource is busy")]
        Busy = -9,
        #[error("empty")]
        Empty = -10,
        #[error("the object is in the wrong state for this call")]
        WrongState = -11,
        #[error("no match")]
        NoMatch = -13,
        #[error("already connected")]
        AlreadyConnected = -14,
        #[error("unsupported parameter value")]
        UnsupportedParameterValue = -15,
        #[error("condition not satisfied")]
        ConditionNotSatisfied = -16,
        #[error("illegal parameter value")]
        IllegalParameterValue = -17,
        #[error("bad option")]
        BadOption = -18,
        #[error("implementation limitation")]
        ImplementationLimitation = -19,
        #[error("not implemented")]
        NotImplemented = -20,
        #[error("invalid class id")]
        InvalidClassId = -21,
        #[error("constraint not satisfied")]
        ConstraintNotSatisfied = -22,
        #[error("alignment error")]
        AlignmentError = -23,
        #[error("hardware error")]
        HardwareError = -24,
        #[error("invalid data format")]
        InvalidDataFormat = -25,
        #[error("invalid operation")]
        InvalidOperation = -26,
        #[error("internal hypervisor error")]
        InternalError = -32768,
        #[error("the hypervisor returned output values that could not be decoded")]
        ValueInvalid = i64::MAX - 1,
    }
}
