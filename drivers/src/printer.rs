/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros to print to the log sink

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

#[cfg(all(feature = "uart", not(feature = "std")))]
extern "C" {
    /// Platform supplied UART transmit routine.
    fn keyfort_uart_write(buf: *const u8, len: usize);
}

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(not(feature = "std"))]
    #[inline(never)]
    fn write_str(&mut self, _str: &str) -> Result<(), Self::Error> {
        #[cfg(feature = "uart")]
        unsafe {
            keyfort_uart_write(_str.as_ptr(), _str.len());
        }
        Ok(())
    }

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(feature = "std")]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        print!("{str}");
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

/// Displays a byte slice as upper case hex.
pub struct HexBytes<'a>(pub &'a [u8]);
impl uDisplay for HexBytes<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for &x in self.0.iter() {
            f.write_char(hex_digit(x >> 4))?;
            f.write_char(hex_digit(x & 0xf))?;
        }
        Ok(())
    }
}

/// Displays a `u32` as eight upper case hex digits.
pub struct HexWord(pub u32);
impl uDisplay for HexWord {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        HexBytes(&self.0.to_be_bytes()).fmt(f)
    }
}

fn hex_digit(nibble: u8) -> char {
    if nibble < 10 {
        (nibble + b'0') as char
    } else {
        (nibble - 10 + b'A') as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Capture(String);

    impl uWrite for Capture {
        type Error = Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_hex_bytes() {
        let mut out = Capture(String::new());
        ufmt::uwrite!(&mut out, "{}", HexBytes(&[0x00, 0x1f, 0xa0, 0xff])).unwrap();
        assert_eq!(out.0, "001FA0FF");
    }

    #[test]
    fn test_hex_word() {
        let mut out = Capture(String::new());
        ufmt::uwrite!(&mut out, "0x{}", HexWord(0x0002_000d)).unwrap();
        assert_eq!(out.0, "0x0002000D");
    }
}
