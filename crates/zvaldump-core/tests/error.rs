//! Tests for error messages and which errors reach the caller

mod common;

use common::FakeProcess;
use zvaldump_core::error::{InspectError, Result};
use zvaldump_core::layout::ZendLayout;
use zvaldump_core::session::{Session, EXECUTOR_GLOBALS, STD_GET_PROPERTIES};
use zvaldump_core::types::Address;
use zvaldump_core::zval::ZvalType;
use zvaldump_core::MemoryAccessor;

#[test]
fn test_invalid_expression_message_is_exact()
{
    let error = InspectError::InvalidExpression {
        declared: "long".to_string(),
    };
    assert_eq!(format!("{error}"), "Invalid expression - must be zval *");
}

#[test]
fn test_memory_access_message()
{
    let error = InspectError::memory(Address::from(0x1000), 8, "bad address");
    assert_eq!(error.to_string(), "cannot read 8 bytes at 0x1000: bad address");
}

#[test]
fn test_structure_error_messages()
{
    assert_eq!(InspectError::UnknownTag(42).to_string(), "Unknown type: 42");
    assert_eq!(InspectError::StaleObjectHandle(3).to_string(), "stale object handle #3");
    let corrupt = InspectError::CorruptTable {
        table: Address::from(0x10),
        entry: Address::from(0x20),
    };
    assert_eq!(corrupt.to_string(), "hash table 0x10 is corrupt: entry 0x20 visited twice");
}

#[test]
fn test_process_error_messages()
{
    assert!(InspectError::ProcessNotFound(12345).to_string().contains("12345"));
    assert!(InspectError::PermissionDenied("ptrace_scope".to_string())
        .to_string()
        .contains("ptrace_scope"));
    assert!(InspectError::SymbolNotFound("executor_globals".to_string())
        .to_string()
        .contains("executor_globals"));
}

#[test]
fn test_io_error_conversion()
{
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: InspectError = io_err.into();
    assert!(matches!(err, InspectError::Io(_)));
}

#[test]
fn test_result_type()
{
    fn fails() -> Result<u32>
    {
        Err(InspectError::UnknownTag(11))
    }
    assert!(matches!(fails(), Err(InspectError::UnknownTag(11))));
}

#[test]
fn test_session_needs_executor_globals()
{
    struct NoSymbols;

    impl MemoryAccessor for NoSymbols
    {
        fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
        {
            Err(InspectError::memory(address, len, "unmapped"))
        }

        fn symbol_address(&self, name: &str) -> Result<Address>
        {
            Err(InspectError::SymbolNotFound(name.to_string()))
        }
    }

    let err = Session::resolve(&NoSymbols, ZendLayout::default()).unwrap_err();
    assert!(matches!(err, InspectError::SymbolNotFound(ref name) if name == EXECUTOR_GLOBALS));
}

#[test]
fn test_session_needs_standard_handlers()
{
    let mut fake = FakeProcess::new();
    fake.remove_symbol(STD_GET_PROPERTIES);

    let err = Session::resolve(&fake, fake.layout).unwrap_err();
    assert!(matches!(err, InspectError::SymbolNotFound(ref name) if name == STD_GET_PROPERTIES));
}

#[test]
fn test_session_resolves_objects_store()
{
    let fake = FakeProcess::new();
    let session = fake.session();
    assert_eq!(
        session.objects_store,
        fake.executor_globals + fake.layout.executor_globals.objects_store
    );
}

#[test]
fn test_layout_override_moves_sentinel()
{
    let mut fake = FakeProcess::new();
    let moved = fake.null();
    fake.write_ptr(fake.executor_globals + 40, moved);

    let layout = ZendLayout::default().with_executor_globals(Some(40), None);
    let session = Session::resolve(&fake, layout).unwrap();
    assert_eq!(session.uninitialized, moved);
}

#[test]
fn test_render_never_fails()
{
    // Every kind of bad pointer still produces text.
    let mut fake = FakeProcess::new();
    let dangling = fake.zval(ZvalType::String, 0xdead_0000);
    fake.write_u32(dangling + fake.layout.zval.str_len, 4);

    let output = fake.print(dangling);
    assert_eq!(
        output,
        format!("[{dangling}][6@string] <cannot read 4 bytes at 0xdead0000: unmapped>\n")
    );
}
