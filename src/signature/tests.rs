use crate::ty::{Fixed, Str, Type};

use super::{parse_all, parse_signature, parse_single, SignatureError, MAX_SIGNATURE};

use SignatureError::*;

macro_rules! test {
    ($input:expr, $expected:pat) => {{
        let input: &str = $input;
        let actual = parse_all(input).map(|_| ());

        assert!(
            matches!(actual, $expected),
            "{input:?}: {actual:?} does not match {}",
            stringify!($expected)
        );
    }};
}

#[test]
fn signature_tests() {
    test!("", Ok(..));
    test!("sss", Ok(..));
    test!("i", Ok(..));
    test!("b", Ok(..));
    test!("ai", Ok(..));
    test!("(i)", Ok(..));
    test!("a{sv}", Ok(..));
    test!("aa{s(ia{oy})}", Ok(..));
    test!("w", Err(UnknownTypeCode(b'w')));
    test!("a", Err(MissingArrayElementType));
    test!("aaaaaa", Err(MissingArrayElementType));
    test!("ii(ii)a", Err(MissingArrayElementType));
    test!("ia", Err(MissingArrayElementType));
    test!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai", Ok(..));
    test!(
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaai",
        Err(ExceededMaximumArrayRecursion)
    );
    test!(")", Err(StructEndedButNotStarted));
    test!("}", Err(DictEndedButNotStarted));
    test!("i)", Err(StructEndedButNotStarted));
    test!("a)", Err(MissingArrayElementType));
    test!("(", Err(StructStartedButNotEnded));
    test!("(i", Err(StructStartedButNotEnded));
    test!("(iiiii", Err(StructStartedButNotEnded));
    test!("(ai", Err(StructStartedButNotEnded));
    test!("()", Err(StructHasNoFields));
    test!("(())", Err(StructHasNoFields));
    test!("a()", Err(StructHasNoFields));
    test!("i()", Err(StructHasNoFields));
    test!("()i", Err(StructHasNoFields));
    test!("(a)", Err(MissingArrayElementType));
    test!("a{ia}", Err(MissingArrayElementType));
    test!("a{}", Err(DictEntryHasNoFields));
    test!("a{aii}", Err(DictKeyMustBeBasicType));
    test!("a{vi}", Err(DictKeyMustBeBasicType));
    test!(" ", Err(UnknownTypeCode(b' ')));
    test!("not a valid signature", Err(UnknownTypeCode(..)));
    test!("123", Err(UnknownTypeCode(b'1')));
    test!(".", Err(UnknownTypeCode(b'.')));
    test!("r", Err(UnknownTypeCode(b'r')));
    test!("e", Err(UnknownTypeCode(b'e')));
    /* https://bugs.freedesktop.org/show_bug.cgi?id=17803 */
    test!("a{(ii)i}", Err(DictKeyMustBeBasicType));
    test!("a{i}", Err(DictEntryHasOnlyOneField));
    test!("a{is", Err(DictStartedButNotEnded));
    test!("{is}", Err(DictEntryNotInsideArray));
    test!("({is})", Err(DictEntryNotInsideArray));
    test!("a{isi}", Err(DictEntryHasTooManyFields));
    test!(&"i".repeat(255), Ok(..));
    test!(&"i".repeat(MAX_SIGNATURE), Err(SignatureTooLong));
    test! {
        "((((((((((((((((((((((((((((((((ii))))))))))))))))))))))))))))))))",
        Ok(..)
    };
    test! {
        "(((((((((((((((((((((((((((((((((ii))))))))))))))))))))))))))))))))",
        Err(ExceededMaximumStructRecursion)
    };
}

#[test]
fn parse_with_cursor() -> Result<(), SignatureError> {
    let sig = "ua{sv}(yo)";

    let (ty, pos) = parse_signature(sig, 0)?;
    assert_eq!(ty, Type::Fixed(Fixed::UInt32));
    assert_eq!(pos, 1);

    let (ty, pos) = parse_signature(sig, pos)?;
    assert_eq!(
        ty,
        Type::Array(Box::new(Type::DictEntry(Box::new((
            Type::Str(Str::String),
            Type::Variant
        )))))
    );
    assert_eq!(pos, 6);

    let (ty, pos) = parse_signature(sig, pos)?;
    assert_eq!(
        ty,
        Type::Struct(Box::from([
            Type::Fixed(Fixed::Byte),
            Type::Str(Str::ObjectPath)
        ]))
    );
    assert_eq!(pos, sig.len());

    assert_eq!(parse_signature(sig, pos), Err(UnexpectedEnd));
    Ok(())
}

#[test]
fn single_complete_type() {
    assert!(parse_single("a{sv}").is_ok());
    assert_eq!(parse_single(""), Err(NotSingleCompleteType));
    assert_eq!(parse_single("ss"), Err(NotSingleCompleteType));
}

#[test]
fn unparse_round_trip() -> Result<(), SignatureError> {
    for sig in ["y", "a{sv}", "(ia(sv)ao)", "aaay", "a{oa{sa{sv}}}", "(bnqixtdh)", "g"] {
        let types = parse_all(sig)?;
        let unparsed = types.iter().map(|ty| ty.to_string()).collect::<String>();
        assert_eq!(unparsed, sig);
        assert_eq!(parse_all(&unparsed)?, types);
    }

    Ok(())
}

#[test]
fn alignments() -> Result<(), SignatureError> {
    let expected = [
        ("y", 1),
        ("b", 4),
        ("n", 2),
        ("q", 2),
        ("i", 4),
        ("u", 4),
        ("x", 8),
        ("t", 8),
        ("d", 8),
        ("h", 4),
        ("s", 4),
        ("o", 4),
        ("g", 1),
        ("ay", 4),
        ("(y)", 8),
        ("v", 1),
    ];

    for (sig, align) in expected {
        assert_eq!(parse_single(sig)?.alignment(), align, "{sig}");
    }

    Ok(())
}
