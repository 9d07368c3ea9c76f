//! Bundled declarations of the .NET regular expression engine.
//!
//! Only signatures matter here. Method bodies are omitted.

pub const REGEX_PRELUDE: &str = r#"
namespace System
{
    public struct TimeSpan { }
}

namespace System.Text.RegularExpressions
{
    using System;

    [Flags]
    public enum RegexOptions
    {
        None = 0,
        IgnoreCase = 1,
        Multiline = 2,
        ExplicitCapture = 4,
        Compiled = 8,
        Singleline = 16,
        IgnorePatternWhitespace = 32,
        RightToLeft = 64,
        ECMAScript = 256,
        CultureInvariant = 512,
        NonBacktracking = 1024,
    }

    public class Group
    {
        public string Value;
        public bool Success;
        public string Name;
    }

    public class Match
    {
        public string Value;
        public bool Success;
        public int Index;
        public int Length;
        public Match NextMatch();
    }

    public class MatchCollection
    {
        public int Count;
    }

    public class Regex
    {
        protected Regex() { }
        public Regex(string pattern) { }
        public Regex(string pattern, RegexOptions options) { }
        public Regex(string pattern, RegexOptions options, TimeSpan matchTimeout) { }

        public RegexOptions Options;

        public static string Escape(string str);
        public static string Unescape(string str);

        public static bool IsMatch(string input, string pattern);
        public static bool IsMatch(string input, string pattern, RegexOptions options);
        public static bool IsMatch(string input, string pattern, RegexOptions options, TimeSpan matchTimeout);
        public bool IsMatch(string input);
        public bool IsMatch(string input, int startat);

        public static Match Match(string input, string pattern);
        public static Match Match(string input, string pattern, RegexOptions options);
        public static Match Match(string input, string pattern, RegexOptions options, TimeSpan matchTimeout);
        public Match Match(string input);
        public Match Match(string input, int startat);

        public static MatchCollection Matches(string input, string pattern);
        public static MatchCollection Matches(string input, string pattern, RegexOptions options);
        public static MatchCollection Matches(string input, string pattern, RegexOptions options, TimeSpan matchTimeout);
        public MatchCollection Matches(string input);

        public static int Count(string input, string pattern);
        public static int Count(string input, string pattern, RegexOptions options);
        public int Count(string input);

        public static string Replace(string input, string pattern, string replacement);
        public static string Replace(string input, string pattern, string replacement, RegexOptions options);
        public static string Replace(string input, string pattern, string replacement, RegexOptions options, TimeSpan matchTimeout);
        public string Replace(string input, string replacement);

        public static string[] Split(string input, string pattern);
        public static string[] Split(string input, string pattern, RegexOptions options);
        public static string[] Split(string input, string pattern, RegexOptions options, TimeSpan matchTimeout);
        public string[] Split(string input);
    }
}
"#;
