//! Field names used by the decoder.
//!
//! Names follow the target's own headers so a layout report can be checked
//! against them directly.

// Object heads
pub const OB_REFCNT: &str = "ob_refcnt";
pub const OB_TYPE: &str = "ob_type";
pub const OB_SIZE: &str = "ob_size";

// Code objects
pub const CO_ARGCOUNT: &str = "co_argcount";
pub const CO_KWONLYARGCOUNT: &str = "co_kwonlyargcount";
pub const CO_NLOCALS: &str = "co_nlocals";
pub const CO_STACKSIZE: &str = "co_stacksize";
pub const CO_FLAGS: &str = "co_flags";
pub const CO_CODE: &str = "co_code";
pub const CO_CONSTS: &str = "co_consts";
pub const CO_NAMES: &str = "co_names";
pub const CO_VARNAMES: &str = "co_varnames";
pub const CO_FREEVARS: &str = "co_freevars";
pub const CO_CELLVARS: &str = "co_cellvars";
pub const CO_FILENAME: &str = "co_filename";
pub const CO_NAME: &str = "co_name";
pub const CO_FIRSTLINENO: &str = "co_firstlineno";
pub const CO_LNOTAB: &str = "co_lnotab";
pub const CO_ZOMBIEFRAME: &str = "co_zombieframe";

// Function objects
pub const FUNC_CODE: &str = "func_code";

// Frames
pub const F_BACK: &str = "f_back";
pub const F_CODE: &str = "f_code";
pub const F_BUILTINS: &str = "f_builtins";
pub const F_GLOBALS: &str = "f_globals";
pub const F_LOCALS: &str = "f_locals";
pub const F_VALUESTACK: &str = "f_valuestack";
pub const F_STACKTOP: &str = "f_stacktop";
pub const F_TRACE: &str = "f_trace";
pub const F_EXC_TYPE: &str = "f_exc_type";
pub const F_EXC_VALUE: &str = "f_exc_value";
pub const F_EXC_TRACEBACK: &str = "f_exc_traceback";
pub const F_TSTATE: &str = "f_tstate";
pub const F_LASTI: &str = "f_lasti";
pub const F_LINENO: &str = "f_lineno";
pub const F_RESTRICTED: &str = "f_restricted";
pub const F_IBLOCK: &str = "f_iblock";
pub const F_BLOCKSTACK: &str = "f_blockstack";
pub const F_NLOCALS: &str = "f_nlocals";
pub const F_NCELLS: &str = "f_ncells";
pub const F_NFREEVARS: &str = "f_nfreevars";
pub const F_STACKSIZE: &str = "f_stacksize";
pub const F_LOCALSPLUS: &str = "f_localsplus";

// Thread states
pub const TS_NEXT: &str = "next";
pub const TS_INTERP: &str = "interp";
pub const TS_FRAME: &str = "frame";
pub const TS_RECURSION_DEPTH: &str = "recursion_depth";
pub const TS_OVERFLOWED: &str = "overflowed";
pub const TS_RECURSION_CRITICAL: &str = "recursion_critical";
pub const TS_TRACING: &str = "tracing";
pub const TS_USE_TRACING: &str = "use_tracing";
pub const TS_C_PROFILEFUNC: &str = "c_profilefunc";
pub const TS_C_TRACEFUNC: &str = "c_tracefunc";
pub const TS_C_PROFILEOBJ: &str = "c_profileobj";
pub const TS_C_TRACEOBJ: &str = "c_traceobj";
pub const TS_CUREXC_TYPE: &str = "curexc_type";
pub const TS_CUREXC_VALUE: &str = "curexc_value";
pub const TS_CUREXC_TRACEBACK: &str = "curexc_traceback";
pub const TS_EXC_TYPE: &str = "exc_type";
pub const TS_EXC_VALUE: &str = "exc_value";
pub const TS_EXC_TRACEBACK: &str = "exc_traceback";
pub const TS_DICT: &str = "dict";
pub const TS_TICK_COUNTER: &str = "tick_counter";
pub const TS_GILSTATE_COUNTER: &str = "gilstate_counter";
pub const TS_ASYNC_EXC: &str = "async_exc";
pub const TS_THREAD_ID: &str = "thread_id";

// Strings and containers
pub const OB_SHASH: &str = "ob_shash";
pub const OB_SSTATE: &str = "ob_sstate";
pub const OB_SVAL: &str = "ob_sval";
pub const UNICODE_LENGTH: &str = "length";
pub const UNICODE_STR: &str = "str";
pub const UNICODE_HASH: &str = "hash";
pub const OB_ITEM: &str = "ob_item";
pub const OB_IVAL: &str = "ob_ival";
pub const OB_DIGIT: &str = "ob_digit";

// Type objects
pub const TP_NAME: &str = "tp_name";
pub const TP_BASICSIZE: &str = "tp_basicsize";
pub const TP_ITEMSIZE: &str = "tp_itemsize";
pub const TP_FLAGS: &str = "tp_flags";
pub const TP_VERSION_TAG: &str = "tp_version_tag";

// Builtin functions
pub const M_ML: &str = "m_ml";
pub const M_SELF: &str = "m_self";
pub const M_MODULE: &str = "m_module";
pub const ML_NAME: &str = "ml_name";
