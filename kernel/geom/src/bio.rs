use bitflags::bitflags;
use core::fmt::{Debug, Formatter};

/// The command code of a [`Bio`] as it is handed out by the framework.
///
/// This is deliberately an open set of values.
/// Drivers decide which commands they support and must reject the rest.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct BioCmd(pub u8);

impl BioCmd {
    pub const READ: Self = Self(0x01);
    pub const WRITE: Self = Self(0x02);
    pub const DELETE: Self = Self(0x03);
    pub const GETATTR: Self = Self(0x04);
    pub const FLUSH: Self = Self(0x05);
}

bitflags! {
    /// Status flags of a [`Bio`]
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
    pub struct BioFlags: u32 {
        /// The request failed and [`Bio::error`] holds the reason
        const ERROR = 0x01;
        /// The request has been completed by the driver
        const DONE = 0x02;
    }
}

/// The completion status that is passed to a [`Bio`]'s completion callback
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BioCompletion {
    /// `0` on success, otherwise one of the [`errno`](crate::errno) values
    pub error: i32,
    /// How many bytes of the request were *not* transferred
    pub resid: u64,
}

/// A single block I/O request
pub struct Bio<'a> {
    /// What the driver should do
    pub cmd: BioCmd,
    /// Byte offset on the device at which the transfer starts
    pub offset: u64,
    /// The request owned buffer that is read from (write) or filled (read).
    /// Its length is the transfer length.
    pub data: &'a mut [u8],
    /// `0` on success, otherwise one of the [`errno`](crate::errno) values
    pub error: i32,
    /// How many bytes of the request were *not* transferred
    pub resid: u64,
    pub flags: BioFlags,
    on_done: Option<&'a dyn Fn(BioCompletion)>,
}

impl<'a> Bio<'a> {
    pub fn new(cmd: BioCmd, offset: u64, data: &'a mut [u8]) -> Self {
        let resid = data.len() as u64;
        Self {
            cmd,
            offset,
            data,
            error: 0,
            resid,
            flags: BioFlags::empty(),
            on_done: None,
        }
    }

    /// Register a callback that is invoked once the request is completed
    pub fn with_done(mut self, on_done: &'a dyn Fn(BioCompletion)) -> Self {
        self.on_done = Some(on_done);
        self
    }

    /// How many bytes this request transfers
    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether [`biodone()`](Bio::biodone) has already been called
    pub fn is_done(&self) -> bool {
        self.flags.contains(BioFlags::DONE)
    }

    pub fn completion(&self) -> BioCompletion {
        BioCompletion {
            error: self.error,
            resid: self.resid,
        }
    }

    /// Mark the request as completely transferred and complete it
    pub fn finish_ok(&mut self) {
        self.error = 0;
        self.resid = 0;
        self.biodone();
    }

    /// Mark the request as failed with `error` and complete it.
    /// Nothing of a failed request counts as transferred.
    pub fn finish_err(&mut self, error: i32) {
        assert_ne!(error, 0, "a failed bio needs a non-zero error");
        self.error = error;
        self.resid = self.length();
        self.flags |= BioFlags::ERROR;
        self.biodone();
    }

    /// Complete the request with its current status and notify the requester.
    ///
    /// # Panics
    /// A request can only be completed once.
    pub fn biodone(&mut self) {
        assert!(!self.is_done(), "bio completed twice");
        self.flags |= BioFlags::DONE;
        if let Some(on_done) = self.on_done {
            on_done(self.completion());
        }
    }
}

impl Debug for Bio<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bio")
            .field("cmd", &self.cmd)
            .field("offset", &format_args!("{:#x}", self.offset))
            .field("length", &self.length())
            .field("error", &self.error)
            .field("resid", &self.resid)
            .field("flags", &self.flags)
            .finish()
    }
}
